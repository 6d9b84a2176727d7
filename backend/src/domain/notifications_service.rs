//! A user's report inbox.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use pagination::Paginated;
use uuid::Uuid;

use crate::domain::cache::{CacheAside, CacheKey, STATS_TAG, user_tag};
use crate::domain::ports::{NotificationRepository, Notifications};
use crate::domain::{
    AuditAction, AuditEntry, AuditLogger, Caller, Error, Notification, NotificationStatus,
    PageKey, PageQuery, paginate,
};

const UNREAD_TTL: Duration = Duration::from_secs(60);

/// Inbox service implementing [`Notifications`].
#[derive(Clone)]
pub struct NotificationsService {
    notifications: Arc<dyn NotificationRepository>,
    audit: AuditLogger,
    cache: CacheAside,
    clock: Arc<dyn Clock>,
}

impl NotificationsService {
    /// Build the service; unread lists are cached per user.
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        audit: AuditLogger,
        cache: CacheAside,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notifications,
            audit,
            cache,
            clock,
        }
    }
}

#[async_trait]
impl Notifications for NotificationsService {
    async fn list(
        &self,
        caller: &Caller,
        status: Option<NotificationStatus>,
        page: PageQuery,
    ) -> Result<Paginated<Notification>, Error> {
        let user_id = caller.access.require_user()?;
        let status = status.unwrap_or(NotificationStatus::Unread);
        let page = &page;
        let fetch = move || async move {
            let rows = self
                .notifications
                .list(&caller.access, user_id, status, page)
                .await?;
            Ok(paginate(rows, page, |n| PageKey::new(n.created_at, n.id)))
        };
        if status != NotificationStatus::Unread || page.cursor().is_some() {
            return fetch().await;
        }
        let key = CacheKey::new(format!("notifications:{user_id}:unread:{}", page.limit()))
            .map_err(|err| Error::internal(err.to_string()))?;
        self.cache
            .get_or_set(&key, UNREAD_TTL, &[user_tag(user_id)], fetch)
            .await
    }

    async fn archive(&self, caller: &Caller, id: Uuid) -> Result<Notification, Error> {
        let user_id = caller.access.require_user()?;
        let existing = self
            .notifications
            .find(&caller.access, id)
            .await?
            .filter(|n| n.user_id == user_id)
            .ok_or_else(|| Error::not_found("notification not found"))?;
        if existing.status == NotificationStatus::Archived {
            return Ok(existing);
        }
        let archived = self
            .notifications
            .archive(&caller.access, id, self.clock.utc())
            .await?
            .ok_or_else(|| Error::not_found("notification not found"))?;
        self.cache.invalidate_tag(&user_tag(user_id)).await;
        // The report is archived with its notification.
        self.cache.invalidate_tag(STATS_TAG).await;
        self.audit
            .record(
                AuditEntry::new(AuditAction::NotificationArchived, "notification")
                    .actor(Some(user_id))
                    .resource(id)
                    .ip(caller.ip()),
            )
            .await;
        Ok(archived)
    }
}
