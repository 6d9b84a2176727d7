//! PostgreSQL-backed report and notification repositories.
//!
//! A report and its receptor's notification are inserted in one transaction,
//! so a receptor never sees a notification for a report that failed to save.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{NotificationRepository, ReportRepository, ReportRepositoryError};
use crate::domain::{
    AccessContext, Notification, NotificationStatus, PageQuery, Report, ReportStatus,
};

use super::diesel_helpers::{DbFailure, fetch_limit, run_scoped, to_count};
use super::models::{CorruptRow, NotificationRow, ReportRow, decode_all};
use super::pool::DbPool;
use super::schema::{notifications, reports};

fn map_failure(failure: DbFailure) -> ReportRepositoryError {
    failure.into_port(ReportRepositoryError::query, ReportRepositoryError::connection)
}

fn map_corrupt(error: CorruptRow) -> ReportRepositoryError {
    ReportRepositoryError::query(error.to_string())
}

/// Diesel-backed implementation of the `ReportRepository` port.
#[derive(Clone)]
pub struct DieselReportRepository {
    pool: DbPool,
}

impl DieselReportRepository {
    /// Repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn list_by(
        &self,
        ctx: &AccessContext,
        column: ReportParty,
        user_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<Report>, ReportRepositoryError> {
        let cursor = page.cursor().copied();
        let limit = fetch_limit(page);
        let rows: Vec<ReportRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                let mut query = reports::table.select(ReportRow::as_select()).into_boxed();
                query = match column {
                    ReportParty::Emissor => query.filter(reports::emissor_id.eq(user_id)),
                    ReportParty::Receptor => query.filter(reports::receptor_id.eq(user_id)),
                };
                if let Some(key) = cursor {
                    query = query.filter(
                        reports::sent_at
                            .lt(key.at)
                            .or(reports::sent_at.eq(key.at).and(reports::id.lt(key.id))),
                    );
                }
                query
                    .order_by((reports::sent_at.desc(), reports::id.desc()))
                    .limit(limit)
                    .load(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        decode_all(rows).map_err(map_corrupt)
    }
}

#[derive(Debug, Clone, Copy)]
enum ReportParty {
    Emissor,
    Receptor,
}

#[async_trait]
impl ReportRepository for DieselReportRepository {
    async fn create_with_notification(
        &self,
        ctx: &AccessContext,
        report: &Report,
        notification: &Notification,
    ) -> Result<(), ReportRepositoryError> {
        let report_row = ReportRow::from(report);
        let notification_row = NotificationRow::from(notification);
        run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::insert_into(reports::table)
                    .values(&report_row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(notifications::table)
                    .values(&notification_row)
                    .execute(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map(|_| ())
        .map_err(map_failure)
    }

    async fn find(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<Report>, ReportRepositoryError> {
        let row: Option<ReportRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                reports::table
                    .find(id)
                    .select(ReportRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        row.map(Report::try_from).transpose().map_err(map_corrupt)
    }

    async fn mark_viewed(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Report>, ReportRepositoryError> {
        // The status guard makes concurrent views race-free: one wins.
        let row: Option<ReportRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::update(
                    reports::table
                        .find(id)
                        .filter(reports::status.eq(ReportStatus::Sent.as_str())),
                )
                .set((
                    reports::status.eq(ReportStatus::Viewed.as_str()),
                    reports::viewed_at.eq(Some(at)),
                ))
                .returning(ReportRow::as_returning())
                .get_result(conn)
                .await
                .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        row.map(Report::try_from).transpose().map_err(map_corrupt)
    }

    async fn list_sent(
        &self,
        ctx: &AccessContext,
        emissor_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<Report>, ReportRepositoryError> {
        self.list_by(ctx, ReportParty::Emissor, emissor_id, page)
            .await
    }

    async fn list_received(
        &self,
        ctx: &AccessContext,
        receptor_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<Report>, ReportRepositoryError> {
        self.list_by(ctx, ReportParty::Receptor, receptor_id, page)
            .await
    }

    async fn count_by_status(
        &self,
        ctx: &AccessContext,
    ) -> Result<Vec<(ReportStatus, u64)>, ReportRepositoryError> {
        let rows: Vec<(String, i64)> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                reports::table
                    .group_by(reports::status)
                    .select((reports::status, count_star()))
                    .load(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| match status.parse::<ReportStatus>() {
                Ok(status) => Some((status, to_count(count))),
                Err(_) => {
                    warn!(status, "skipping unknown report status in counts");
                    None
                }
            })
            .collect())
    }
}

/// Diesel-backed implementation of the `NotificationRepository` port.
#[derive(Clone)]
pub struct DieselNotificationRepository {
    pool: DbPool,
}

impl DieselNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for DieselNotificationRepository {
    async fn list(
        &self,
        ctx: &AccessContext,
        user_id: Uuid,
        status: NotificationStatus,
        page: &PageQuery,
    ) -> Result<Vec<Notification>, ReportRepositoryError> {
        let cursor = page.cursor().copied();
        let limit = fetch_limit(page);
        let rows: Vec<NotificationRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                let mut query = notifications::table
                    .filter(notifications::user_id.eq(user_id))
                    .filter(notifications::status.eq(status.as_str()))
                    .select(NotificationRow::as_select())
                    .into_boxed();
                if let Some(key) = cursor {
                    query = query.filter(
                        notifications::created_at.lt(key.at).or(notifications::created_at
                            .eq(key.at)
                            .and(notifications::id.lt(key.id))),
                    );
                }
                query
                    .order_by((notifications::created_at.desc(), notifications::id.desc()))
                    .limit(limit)
                    .load(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        decode_all(rows).map_err(map_corrupt)
    }

    async fn find(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<Notification>, ReportRepositoryError> {
        let row: Option<NotificationRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                notifications::table
                    .find(id)
                    .select(NotificationRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        row.map(Notification::try_from)
            .transpose()
            .map_err(map_corrupt)
    }

    async fn archive(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Notification>, ReportRepositoryError> {
        let row: Option<NotificationRow> = run_scoped(&self.pool, ctx, |conn| {
            async move { archive_notification(conn, id, at).await }.scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        row.map(Notification::try_from)
            .transpose()
            .map_err(map_corrupt)
    }
}

/// Archive an unread notification, archive its report alongside, and
/// return the stored row either way.
pub(crate) async fn archive_notification(
    conn: &mut diesel_async::AsyncPgConnection,
    id: Uuid,
    at: DateTime<Utc>,
) -> QueryResult<Option<NotificationRow>> {
    let archived = diesel::update(
        notifications::table
            .find(id)
            .filter(notifications::status.eq(NotificationStatus::Unread.as_str())),
    )
    .set((
        notifications::status.eq(NotificationStatus::Archived.as_str()),
        notifications::archived_at.eq(Some(at)),
    ))
    .execute(conn)
    .await?;
    let row: Option<NotificationRow> = notifications::table
        .find(id)
        .select(NotificationRow::as_select())
        .first(conn)
        .await
        .optional()?;
    if let Some(row) = row.as_ref().filter(|_| archived > 0) {
        diesel::update(
            reports::table
                .find(row.report_id)
                .filter(reports::status.ne(ReportStatus::Archived.as_str())),
        )
        .set(reports::status.eq(ReportStatus::Archived.as_str()))
        .execute(conn)
        .await?;
    }
    Ok(row)
}
