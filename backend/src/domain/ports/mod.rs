//! Domain ports.
//!
//! Driven ports (repositories, key-value store, file storage, job queue)
//! are implemented by outbound adapters. Driving ports (`Accounts`,
//! `Reports`, ...) are implemented by domain services and consumed by the
//! HTTP adapter.

mod macros;
pub(crate) use macros::define_port_error;

mod accounts;
mod audit_repository;
mod calendar;
mod documents;
mod file_repository;
mod file_storage;
mod health_event_repository;
mod job_queue;
mod key_value_store;
mod report_repository;
mod share_link_repository;
mod user_repository;

#[cfg(test)]
pub use accounts::{MockAccounts, MockAdministration};
pub use accounts::{Accounts, Administration};
#[cfg(test)]
pub use audit_repository::MockAuditRepository;
pub use audit_repository::{AuditRepository, AuditRepositoryError};
#[cfg(test)]
pub use calendar::{MockHealthEvents, MockProfessionals};
pub use calendar::{HealthEvents, Professionals};
#[cfg(test)]
pub use documents::{MockFiles, MockNotifications, MockReports, MockShareLinks};
pub use documents::{Files, Notifications, Reports, ShareLinks};
#[cfg(test)]
pub use file_repository::MockFileRepository;
pub use file_repository::{FileRepository, FileRepositoryError};
#[cfg(test)]
pub use file_storage::MockFileStorage;
pub use file_storage::{FileStorage, FileStorageError, StoredObject};
#[cfg(test)]
pub use health_event_repository::{MockHealthEventRepository, MockProfessionalRepository};
pub use health_event_repository::{
    ArchiveNotification, CalendarRepositoryError, HealthEventRepository, ProfessionalRepository,
};
#[cfg(test)]
pub use job_queue::{MockJobQueue, MockJobStatusStore};
pub use job_queue::{JobQueue, JobQueueError, JobStatusStore};
#[cfg(test)]
pub use key_value_store::MockKeyValueStore;
pub use key_value_store::{KeyValueStore, KeyValueStoreError};
#[cfg(test)]
pub use report_repository::{MockNotificationRepository, MockReportRepository};
pub use report_repository::{NotificationRepository, ReportRepository, ReportRepositoryError};
#[cfg(test)]
pub use share_link_repository::MockShareLinkRepository;
pub use share_link_repository::{ShareLinkRepository, ShareLinkRepositoryError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserRepositoryError};
