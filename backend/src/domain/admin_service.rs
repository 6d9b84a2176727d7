//! Administrator use-cases: accounts, audit trail and document statistics.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagination::Paginated;
use tracing::info;
use uuid::Uuid;

use crate::domain::cache::{CacheAside, CacheKey, STATS_TAG};
use crate::domain::ports::{Administration, AuditRepository, ReportRepository, UserRepository};
use crate::domain::{
    AuditAction, AuditEntry, AuditFilter, AuditLogger, AuditRecord, Caller, DocumentFlowStats,
    Error, PageKey, PageQuery, ReportStatus, Role, User, paginate,
};

const STATS_TTL: Duration = Duration::from_secs(60);

/// Administration service implementing [`Administration`].
#[derive(Clone)]
pub struct AdministrationService {
    users: Arc<dyn UserRepository>,
    reports: Arc<dyn ReportRepository>,
    audit_log: Arc<dyn AuditRepository>,
    audit: AuditLogger,
    cache: CacheAside,
}

impl AdministrationService {
    /// Build the service; statistics are cached through `cache`.
    pub fn new(
        users: Arc<dyn UserRepository>,
        reports: Arc<dyn ReportRepository>,
        audit_log: Arc<dyn AuditRepository>,
        audit: AuditLogger,
        cache: CacheAside,
    ) -> Self {
        Self {
            users,
            reports,
            audit_log,
            audit,
            cache,
        }
    }

    async fn compute_stats(&self, caller: &Caller) -> Result<DocumentFlowStats, Error> {
        let mut stats = DocumentFlowStats::default();
        for (status, count) in self.reports.count_by_status(&caller.access).await? {
            match status {
                ReportStatus::Sent => stats.reports_sent = count,
                ReportStatus::Viewed => stats.reports_viewed = count,
                ReportStatus::Archived => stats.reports_archived = count,
            }
        }
        for (role, count) in self.users.count_by_role(&caller.access).await? {
            match role {
                Role::Receptor => stats.receptors = count,
                Role::Emissor => stats.emissors = count,
                Role::Admin => stats.admins = count,
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl Administration for AdministrationService {
    async fn list_users(
        &self,
        caller: &Caller,
        role: Option<Role>,
        page: PageQuery,
    ) -> Result<Paginated<User>, Error> {
        caller.access.require_role(Role::Admin)?;
        let rows = self.users.list(&caller.access, role, &page).await?;
        Ok(paginate(rows, &page, |user| PageKey::new(user.created_at, user.id)))
    }

    async fn set_active(
        &self,
        caller: &Caller,
        user_id: Uuid,
        active: bool,
    ) -> Result<User, Error> {
        let admin_id = caller.access.require_role(Role::Admin)?;
        if admin_id == user_id && !active {
            return Err(Error::forbidden("admins cannot deactivate their own account"));
        }
        let user = self
            .users
            .set_active(&caller.access, user_id, active)
            .await?
            .ok_or_else(|| Error::not_found("user not found"))?;
        let action = if active {
            AuditAction::UserActivated
        } else {
            AuditAction::UserDeactivated
        };
        info!(user_id = %user.id, active, "account status changed");
        self.audit
            .record(
                AuditEntry::new(action, "user")
                    .actor(Some(admin_id))
                    .resource(user.id)
                    .ip(caller.ip()),
            )
            .await;
        Ok(user)
    }

    async fn audit_log(
        &self,
        caller: &Caller,
        filter: AuditFilter,
        page: PageQuery,
    ) -> Result<Paginated<AuditRecord>, Error> {
        caller.access.require_role(Role::Admin)?;
        let rows = self.audit_log.query(&caller.access, &filter, &page).await?;
        Ok(paginate(rows, &page, |record| {
            PageKey::new(record.created_at, record.id)
        }))
    }

    async fn document_flow_stats(&self, caller: &Caller) -> Result<DocumentFlowStats, Error> {
        caller.access.require_role(Role::Admin)?;
        let key = CacheKey::new("admin:stats").map_err(|err| Error::internal(err.to_string()))?;
        self.cache
            .get_or_set(&key, STATS_TTL, &[STATS_TAG.to_owned()], move || {
                self.compute_stats(caller)
            })
            .await
    }
}
