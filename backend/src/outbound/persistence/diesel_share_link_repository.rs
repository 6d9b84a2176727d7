//! PostgreSQL-backed `ShareLinkRepository` implementation using Diesel ORM.
//!
//! Access counting is a single guarded `UPDATE ... RETURNING`, so concurrent
//! visitors can never push a link past its access cap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use uuid::Uuid;

use crate::domain::ports::{ShareLinkRepository, ShareLinkRepositoryError};
use crate::domain::{AccessContext, ShareLink};

use super::diesel_helpers::{DbFailure, run_scoped};
use super::models::{CorruptRow, ShareLinkRow, decode_all};
use super::pool::DbPool;
use super::schema::share_links;

/// Diesel-backed implementation of the `ShareLinkRepository` port.
#[derive(Clone)]
pub struct DieselShareLinkRepository {
    pool: DbPool,
}

impl DieselShareLinkRepository {
    /// Repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: DbFailure) -> ShareLinkRepositoryError {
    failure.into_port(
        ShareLinkRepositoryError::query,
        ShareLinkRepositoryError::connection,
    )
}

fn map_corrupt(error: CorruptRow) -> ShareLinkRepositoryError {
    ShareLinkRepositoryError::query(error.to_string())
}

fn decode(row: Option<ShareLinkRow>) -> Result<Option<ShareLink>, ShareLinkRepositoryError> {
    row.map(ShareLink::try_from).transpose().map_err(map_corrupt)
}

#[async_trait]
impl ShareLinkRepository for DieselShareLinkRepository {
    async fn create(
        &self,
        ctx: &AccessContext,
        link: &ShareLink,
    ) -> Result<(), ShareLinkRepositoryError> {
        let row = ShareLinkRow::from(link);
        run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::insert_into(share_links::table)
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

    async fn list(
        &self,
        ctx: &AccessContext,
        owner_id: Uuid,
    ) -> Result<Vec<ShareLink>, ShareLinkRepositoryError> {
        let rows: Vec<ShareLinkRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                share_links::table
                    .filter(share_links::owner_id.eq(owner_id))
                    .select(ShareLinkRow::as_select())
                    .order_by((share_links::created_at.desc(), share_links::id.desc()))
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
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError> {
        let row = run_scoped(&self.pool, ctx, |conn| {
            async move {
                share_links::table
                    .find(id)
                    .select(ShareLinkRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        decode(row)
    }

    async fn find_by_token_hash(
        &self,
        ctx: &AccessContext,
        token_hash: &str,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError> {
        let token_hash = token_hash.to_owned();
        let row = run_scoped(&self.pool, ctx, |conn| {
            async move {
                share_links::table
                    .filter(share_links::token_hash.eq(token_hash))
                    .select(ShareLinkRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        decode(row)
    }

    async fn revoke(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError> {
        let row = run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::update(
                    share_links::table
                        .find(id)
                        .filter(share_links::revoked_at.is_null()),
                )
                .set(share_links::revoked_at.eq(Some(at)))
                .execute(conn)
                .await?;
                share_links::table
                    .find(id)
                    .select(ShareLinkRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        decode(row)
    }

    async fn record_access(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError> {
        let row = run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::update(
                    share_links::table
                        .find(id)
                        .filter(share_links::revoked_at.is_null())
                        .filter(share_links::expires_at.gt(now))
                        .filter(
                            share_links::max_accesses
                                .is_null()
                                .or(share_links::access_count
                                    .nullable()
                                    .lt(share_links::max_accesses)),
                        ),
                )
                .set(share_links::access_count.eq(share_links::access_count + 1))
                .returning(ShareLinkRow::as_returning())
                .get_result(conn)
                .await
                .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        decode(row)
    }

    async fn revoke_expired(
        &self,
        ctx: &AccessContext,
        now: DateTime<Utc>,
    ) -> Result<u64, ShareLinkRepositoryError> {
        let revoked = run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::update(
                    share_links::table
                        .filter(share_links::revoked_at.is_null())
                        .filter(share_links::expires_at.le(now)),
                )
                .set(share_links::revoked_at.eq(Some(now)))
                .execute(conn)
                .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        Ok(u64::try_from(revoked).unwrap_or_default())
    }
}
