//! PostgreSQL-backed health event and professional repositories.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use uuid::Uuid;

use crate::domain::ports::{
    ArchiveNotification, CalendarRepositoryError, HealthEventRepository, ProfessionalRepository,
};
use crate::domain::{AccessContext, EventRange, HealthEvent, Professional};

use super::diesel_helpers::{DbFailure, run_scoped};
use super::diesel_report_repository::archive_notification;
use super::models::{
    CorruptRow, HealthEventRow, HealthEventUpdate, ProfessionalRow, decode_all,
};
use super::pool::DbPool;
use super::schema::{health_events, professionals};

fn map_failure(failure: DbFailure) -> CalendarRepositoryError {
    failure.into_port(
        CalendarRepositoryError::query,
        CalendarRepositoryError::connection,
    )
}

fn map_corrupt(error: CorruptRow) -> CalendarRepositoryError {
    CalendarRepositoryError::query(error.to_string())
}

/// Diesel-backed implementation of the `HealthEventRepository` port.
#[derive(Clone)]
pub struct DieselHealthEventRepository {
    pool: DbPool,
}

impl DieselHealthEventRepository {
    /// Repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthEventRepository for DieselHealthEventRepository {
    async fn create(
        &self,
        ctx: &AccessContext,
        event: &HealthEvent,
        archive: Option<ArchiveNotification>,
    ) -> Result<(), CalendarRepositoryError> {
        let row = HealthEventRow::from(event);
        run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::insert_into(health_events::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                if let Some(archive) = archive {
                    archive_notification(conn, archive.notification_id, archive.at).await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)
    }

    async fn find(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<HealthEvent>, CalendarRepositoryError> {
        let row: Option<HealthEventRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                health_events::table
                    .find(id)
                    .select(HealthEventRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        row.map(HealthEvent::try_from)
            .transpose()
            .map_err(map_corrupt)
    }

    async fn list(
        &self,
        ctx: &AccessContext,
        owner_id: Uuid,
        range: EventRange,
    ) -> Result<Vec<HealthEvent>, CalendarRepositoryError> {
        let rows: Vec<HealthEventRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                let mut query = health_events::table
                    .filter(health_events::owner_id.eq(owner_id))
                    .select(HealthEventRow::as_select())
                    .into_boxed();
                if let Some(from) = range.from {
                    query = query.filter(health_events::starts_at.ge(from));
                }
                if let Some(to) = range.to {
                    query = query.filter(health_events::starts_at.le(to));
                }
                query
                    .order_by((health_events::starts_at.asc(), health_events::id.asc()))
                    .load(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        decode_all(rows).map_err(map_corrupt)
    }

    async fn update(
        &self,
        ctx: &AccessContext,
        event: &HealthEvent,
    ) -> Result<bool, CalendarRepositoryError> {
        let id = event.id;
        let changes = HealthEventUpdate::from(event);
        let updated = run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::update(health_events::table.find(id))
                    .set(&changes)
                    .execute(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        Ok(updated > 0)
    }

    async fn delete(&self, ctx: &AccessContext, id: Uuid) -> Result<bool, CalendarRepositoryError> {
        let deleted = run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::delete(health_events::table.find(id))
                    .execute(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        Ok(deleted > 0)
    }
}

/// Diesel-backed implementation of the `ProfessionalRepository` port.
#[derive(Clone)]
pub struct DieselProfessionalRepository {
    pool: DbPool,
}

impl DieselProfessionalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfessionalRepository for DieselProfessionalRepository {
    async fn create(
        &self,
        ctx: &AccessContext,
        professional: &Professional,
    ) -> Result<(), CalendarRepositoryError> {
        let row = ProfessionalRow::from(professional);
        run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::insert_into(professionals::table)
                    .values(&row)
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
    ) -> Result<Option<Professional>, CalendarRepositoryError> {
        let row: Option<ProfessionalRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                professionals::table
                    .find(id)
                    .select(ProfessionalRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        Ok(row.map(Professional::from))
    }

    async fn list(
        &self,
        ctx: &AccessContext,
        owner_id: Uuid,
    ) -> Result<Vec<Professional>, CalendarRepositoryError> {
        let rows: Vec<ProfessionalRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                professionals::table
                    .filter(professionals::owner_id.eq(owner_id))
                    .select(ProfessionalRow::as_select())
                    .order_by((professionals::name.asc(), professionals::id.asc()))
                    .load(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        Ok(rows.into_iter().map(Professional::from).collect())
    }

    async fn delete(&self, ctx: &AccessContext, id: Uuid) -> Result<bool, CalendarRepositoryError> {
        // `health_events.professional_id` is `ON DELETE SET NULL`.
        let deleted = run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::delete(professionals::table.find(id))
                    .execute(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        Ok(deleted > 0)
    }
}
