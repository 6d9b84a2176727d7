//! PostgreSQL-backed `AuditRepository` implementation using Diesel ORM.
//!
//! The table is append-only: migrations grant the application role INSERT
//! and SELECT on `audit_log` and nothing else.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;

use crate::domain::ports::{AuditRepository, AuditRepositoryError};
use crate::domain::{AccessContext, AuditFilter, AuditRecord, PageQuery};

use super::diesel_helpers::{DbFailure, fetch_limit, run_scoped};
use super::models::{AuditRow, decode_all};
use super::pool::DbPool;
use super::schema::audit_log;

/// Diesel-backed implementation of the `AuditRepository` port.
#[derive(Clone)]
pub struct DieselAuditRepository {
    pool: DbPool,
}

impl DieselAuditRepository {
    /// Repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: DbFailure) -> AuditRepositoryError {
    failure.into_port(AuditRepositoryError::query, AuditRepositoryError::connection)
}

#[async_trait]
impl AuditRepository for DieselAuditRepository {
    async fn append(
        &self,
        ctx: &AccessContext,
        record: &AuditRecord,
    ) -> Result<(), AuditRepositoryError> {
        let row = AuditRow::from(record);
        run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::insert_into(audit_log::table)
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

    async fn query(
        &self,
        ctx: &AccessContext,
        filter: &AuditFilter,
        page: &PageQuery,
    ) -> Result<Vec<AuditRecord>, AuditRepositoryError> {
        let filter = filter.clone();
        let cursor = page.cursor().copied();
        let limit = fetch_limit(page);
        let rows: Vec<AuditRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                let mut query = audit_log::table.select(AuditRow::as_select()).into_boxed();
                if let Some(actor_id) = filter.actor_id {
                    query = query.filter(audit_log::actor_id.eq(actor_id));
                }
                if let Some(action) = filter.action {
                    query = query.filter(audit_log::action.eq(action.as_str()));
                }
                if let Some(from) = filter.from {
                    query = query.filter(audit_log::created_at.ge(from));
                }
                if let Some(to) = filter.to {
                    query = query.filter(audit_log::created_at.le(to));
                }
                if let Some(key) = cursor {
                    query = query.filter(
                        audit_log::created_at
                            .lt(key.at)
                            .or(audit_log::created_at.eq(key.at).and(audit_log::id.lt(key.id))),
                    );
                }
                query
                    .order_by((audit_log::created_at.desc(), audit_log::id.desc()))
                    .limit(limit)
                    .load(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        decode_all(rows).map_err(|err| AuditRepositoryError::query(err.to_string()))
    }
}
