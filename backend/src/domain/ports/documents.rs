//! Driving ports for files, reports, notifications, and share links.
use async_trait::async_trait;
use pagination::Paginated;
use uuid::Uuid;

use crate::domain::{
    Caller, CreatedShareLink, Error, FileContent, JobStatus, Notification, NotificationStatus,
    PageQuery, Report, ReportDraft, ShareLink, ShareLinkDraft, SharedBundle, StoredFile, Upload,
};

/// Driving port for uploaded files.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Files: Send + Sync {
    async fn upload(&self, caller: &Caller, upload: Upload) -> Result<StoredFile, Error>;

    async fn list(&self, caller: &Caller, page: PageQuery) -> Result<Paginated<StoredFile>, Error>;

    async fn download(&self, caller: &Caller, id: Uuid) -> Result<FileContent, Error>;

    async fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), Error>;
}

/// Driving port for sending and reading reports.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Reports: Send + Sync {
    async fn send(&self, caller: &Caller, draft: ReportDraft) -> Result<Report, Error>;

    async fn list_sent(&self, caller: &Caller, page: PageQuery) -> Result<Paginated<Report>, Error>;

    async fn list_received(
        &self,
        caller: &Caller,
        page: PageQuery,
    ) -> Result<Paginated<Report>, Error>;

    /// Fetch one report; the receptor's first view marks it viewed.
    async fn get(&self, caller: &Caller, id: Uuid) -> Result<Report, Error>;

    /// Queue a batch send, returning the initial job status.
    async fn enqueue_batch(
        &self,
        caller: &Caller,
        items: Vec<ReportDraft>,
    ) -> Result<JobStatus, Error>;

    /// Progress of a job owned by the caller.
    async fn job_status(&self, caller: &Caller, job_id: Uuid) -> Result<JobStatus, Error>;
}

/// Driving port for a user's inbox.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifications: Send + Sync {
    /// Caller's notifications; `None` means unread.
    async fn list(
        &self,
        caller: &Caller,
        status: Option<NotificationStatus>,
        page: PageQuery,
    ) -> Result<Paginated<Notification>, Error>;

    async fn archive(&self, caller: &Caller, id: Uuid) -> Result<Notification, Error>;
}

/// Driving port for share links and their public redemption.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShareLinks: Send + Sync {
    async fn create(&self, caller: &Caller, draft: ShareLinkDraft)
    -> Result<CreatedShareLink, Error>;

    async fn list(&self, caller: &Caller) -> Result<Vec<ShareLink>, Error>;

    async fn revoke(&self, caller: &Caller, id: Uuid) -> Result<ShareLink, Error>;

    /// Public lookup; every unusable link reads as not found.
    async fn resolve(&self, caller: &Caller, token: &str) -> Result<SharedBundle, Error>;

    /// Public download of one file in the link.
    async fn download(
        &self,
        caller: &Caller,
        token: &str,
        file_id: Uuid,
    ) -> Result<FileContent, Error>;
}
