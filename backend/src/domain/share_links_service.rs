//! Share links: owner management and public resolution by token.
//!
//! Public lookups run under the system access context and answer every
//! unusable link (unknown, revoked, expired, exhausted) with the same
//! `404` so callers cannot tell link states apart.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::files_service::load_content;
use crate::domain::ports::{FileRepository, FileStorage, ShareLinkRepository, ShareLinks};
use crate::domain::{
    AccessContext, AuditAction, AuditEntry, AuditLogger, Caller, CreatedShareLink, Error,
    FileContent, ShareLink, ShareLinkDraft, ShareToken, SharedBundle,
};

const LINK_NOT_FOUND: &str = "share link not found";

/// Share-link service implementing [`ShareLinks`].
#[derive(Clone)]
pub struct ShareLinksService {
    links: Arc<dyn ShareLinkRepository>,
    files: Arc<dyn FileRepository>,
    storage: Arc<dyn FileStorage>,
    audit: AuditLogger,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl ShareLinksService {
    /// `base_url` prefixes the token in returned links, e.g.
    /// `https://portal.example/shared`.
    pub fn new(
        links: Arc<dyn ShareLinkRepository>,
        files: Arc<dyn FileRepository>,
        storage: Arc<dyn FileStorage>,
        audit: AuditLogger,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            links,
            files,
            storage,
            audit,
            clock,
            base_url: base_url.into(),
        }
    }

    async fn by_token(&self, token: &str) -> Result<ShareLink, Error> {
        let token = ShareToken::presented(token);
        if token.as_str().is_empty() {
            return Err(Error::not_found(LINK_NOT_FOUND));
        }
        self.links
            .find_by_token_hash(&AccessContext::system(), &token.digest())
            .await?
            .ok_or_else(|| Error::not_found(LINK_NOT_FOUND))
    }

    async fn owned(&self, caller: &Caller, id: Uuid) -> Result<(Uuid, ShareLink), Error> {
        let owner_id = caller.access.require_user()?;
        let link = self
            .links
            .find(&caller.access, id)
            .await?
            .filter(|link| link.owner_id == owner_id)
            .ok_or_else(|| Error::not_found(LINK_NOT_FOUND))?;
        Ok((owner_id, link))
    }
}

#[async_trait]
impl ShareLinks for ShareLinksService {
    async fn create(
        &self,
        caller: &Caller,
        draft: ShareLinkDraft,
    ) -> Result<CreatedShareLink, Error> {
        let owner_id = caller.access.require_user()?;
        let found = self
            .files
            .find_many(&caller.access, &draft.file_ids)
            .await?;
        for id in &draft.file_ids {
            let shareable = match found.iter().find(|file| file.id == *id) {
                Some(file) if file.owner_id == owner_id => true,
                Some(_) => {
                    self.files
                        .is_received_by(&caller.access, *id, owner_id)
                        .await?
                }
                None => false,
            };
            if !shareable {
                return Err(Error::invalid_request(format!("file {id} cannot be shared"))
                    .with_details(json!({ "field": "fileIds", "code": "invalid_file" })));
            }
        }

        let now = self.clock.utc();
        let token = ShareToken::generate();
        let link = ShareLink {
            id: Uuid::new_v4(),
            owner_id,
            token_hash: token.digest(),
            file_ids: draft.file_ids,
            expires_at: now + draft.lifetime,
            max_accesses: draft.max_accesses,
            access_count: 0,
            revoked_at: None,
            created_at: now,
        };
        self.links.create(&caller.access, &link).await?;
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), token.as_str());
        info!(share_link_id = %link.id, files = link.file_ids.len(), "share link created");
        self.audit
            .record(
                AuditEntry::new(AuditAction::ShareLinkCreated, "share_link")
                    .actor(Some(owner_id))
                    .resource(link.id)
                    .ip(caller.ip())
                    .metadata(json!({
                        "files": link.file_ids.len(),
                        "expiresAt": link.expires_at,
                        "maxAccesses": link.max_accesses,
                    })),
            )
            .await;
        Ok(CreatedShareLink { link, token, url })
    }

    async fn list(&self, caller: &Caller) -> Result<Vec<ShareLink>, Error> {
        let owner_id = caller.access.require_user()?;
        Ok(self.links.list(&caller.access, owner_id).await?)
    }

    async fn revoke(&self, caller: &Caller, id: Uuid) -> Result<ShareLink, Error> {
        let (owner_id, link) = self.owned(caller, id).await?;
        if link.revoked_at.is_some() {
            return Ok(link);
        }
        let revoked = self
            .links
            .revoke(&caller.access, id, self.clock.utc())
            .await?
            .ok_or_else(|| Error::not_found(LINK_NOT_FOUND))?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::ShareLinkRevoked, "share_link")
                    .actor(Some(owner_id))
                    .resource(id)
                    .ip(caller.ip()),
            )
            .await;
        Ok(revoked)
    }

    async fn resolve(&self, caller: &Caller, token: &str) -> Result<SharedBundle, Error> {
        let system = AccessContext::system();
        let link = self.by_token(token).await?;
        let link = self
            .links
            .record_access(&system, link.id, self.clock.utc())
            .await?
            .ok_or_else(|| Error::not_found(LINK_NOT_FOUND))?;
        let files = self.files.find_many(&system, &link.file_ids).await?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::ShareLinkAccessed, "share_link")
                    .resource(link.id)
                    .ip(caller.ip())
                    .metadata(json!({ "accessCount": link.access_count })),
            )
            .await;
        Ok(SharedBundle { link, files })
    }

    async fn download(
        &self,
        caller: &Caller,
        token: &str,
        file_id: Uuid,
    ) -> Result<FileContent, Error> {
        let link = self.by_token(token).await?;
        let now = self.clock.utc();
        if !link.is_usable(now) || !link.file_ids.contains(&file_id) {
            return Err(Error::not_found(LINK_NOT_FOUND));
        }
        // Downloads draw on the same access budget as resolutions.
        let link = self
            .links
            .record_access(&AccessContext::system(), link.id, now)
            .await?
            .ok_or_else(|| Error::not_found(LINK_NOT_FOUND))?;
        let file = self
            .files
            .find(&AccessContext::system(), file_id)
            .await?
            .ok_or_else(|| Error::not_found("file not found"))?;
        let content = load_content(self.storage.as_ref(), file).await?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::FileDownloaded, "file")
                    .resource(file_id)
                    .ip(caller.ip())
                    .metadata(json!({ "shareLinkId": link.id, "accessCount": link.access_count })),
            )
            .await;
        Ok(content)
    }
}

#[cfg(test)]
#[path = "share_links_service_tests.rs"]
mod tests;
