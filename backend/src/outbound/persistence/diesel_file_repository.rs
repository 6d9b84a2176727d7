//! PostgreSQL-backed `FileRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use uuid::Uuid;

use crate::domain::ports::{FileRepository, FileRepositoryError};
use crate::domain::{AccessContext, PageQuery, StoredFile};

use super::diesel_helpers::{DbFailure, fetch_limit, is_foreign_key_violation, run_scoped};
use super::models::{CorruptRow, FileRow, decode_all};
use super::pool::DbPool;
use super::schema::{files, health_events, reports, share_links};

diesel::define_sql_function! {
    /// `array_remove(array, element)`.
    fn array_remove(
        array: diesel::sql_types::Array<diesel::sql_types::Uuid>,
        element: diesel::sql_types::Uuid,
    ) -> diesel::sql_types::Array<diesel::sql_types::Uuid>;
}

/// Diesel-backed implementation of the `FileRepository` port.
#[derive(Clone)]
pub struct DieselFileRepository {
    pool: DbPool,
}

impl DieselFileRepository {
    /// Repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: DbFailure) -> FileRepositoryError {
    failure.into_port(FileRepositoryError::query, FileRepositoryError::connection)
}

fn map_corrupt(error: CorruptRow) -> FileRepositoryError {
    FileRepositoryError::query(error.to_string())
}

/// Outcome of a delete attempt inside the transaction.
enum Removal {
    Deleted,
    Missing,
    Referenced,
}

#[async_trait]
impl FileRepository for DieselFileRepository {
    async fn insert(
        &self,
        ctx: &AccessContext,
        file: &StoredFile,
    ) -> Result<(), FileRepositoryError> {
        let row = FileRow::from(file);
        run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::insert_into(files::table)
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
    ) -> Result<Option<StoredFile>, FileRepositoryError> {
        let row: Option<FileRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                files::table
                    .find(id)
                    .select(FileRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        row.map(StoredFile::try_from)
            .transpose()
            .map_err(map_corrupt)
    }

    async fn find_many(
        &self,
        ctx: &AccessContext,
        ids: &[Uuid],
    ) -> Result<Vec<StoredFile>, FileRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        let rows: Vec<FileRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                files::table
                    .filter(files::id.eq_any(ids))
                    .select(FileRow::as_select())
                    .order_by(files::created_at.desc())
                    .load(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        decode_all(rows).map_err(map_corrupt)
    }

    async fn list_by_owner(
        &self,
        ctx: &AccessContext,
        owner_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<StoredFile>, FileRepositoryError> {
        let cursor = page.cursor().copied();
        let limit = fetch_limit(page);
        let rows: Vec<FileRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                let mut query = files::table
                    .filter(files::owner_id.eq(owner_id))
                    .select(FileRow::as_select())
                    .into_boxed();
                if let Some(key) = cursor {
                    query = query.filter(
                        files::created_at
                            .lt(key.at)
                            .or(files::created_at.eq(key.at).and(files::id.lt(key.id))),
                    );
                }
                query
                    .order_by((files::created_at.desc(), files::id.desc()))
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

    async fn is_received_by(
        &self,
        ctx: &AccessContext,
        file_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, FileRepositoryError> {
        run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::select(exists(
                    reports::table
                        .filter(reports::file_id.eq(file_id))
                        .filter(reports::receptor_id.eq(user_id)),
                ))
                .get_result(conn)
                .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)
    }

    async fn delete(&self, ctx: &AccessContext, id: Uuid) -> Result<bool, FileRepositoryError> {
        let outcome = run_scoped(&self.pool, ctx, |conn| {
            async move {
                let referenced: bool =
                    diesel::select(exists(reports::table.filter(reports::file_id.eq(id))))
                        .get_result(conn)
                        .await?;
                if referenced {
                    return Ok(Removal::Referenced);
                }
                let deleted = diesel::delete(files::table.find(id)).execute(conn).await?;
                if deleted > 0 {
                    // Events and share links keep their remaining files.
                    diesel::update(health_events::table.filter(health_events::file_ids.contains(vec![id])))
                        .set(health_events::file_ids.eq(array_remove(health_events::file_ids, id)))
                        .execute(conn)
                        .await?;
                    diesel::update(share_links::table.filter(share_links::file_ids.contains(vec![id])))
                        .set(share_links::file_ids.eq(array_remove(share_links::file_ids, id)))
                        .execute(conn)
                        .await?;
                }
                Ok(if deleted == 0 {
                    Removal::Missing
                } else {
                    Removal::Deleted
                })
            }
            .scope_boxed()
        })
        .await;
        match outcome {
            Ok(Removal::Deleted) => Ok(true),
            Ok(Removal::Missing) => Ok(false),
            Ok(Removal::Referenced) => Err(FileRepositoryError::in_use(id)),
            // A report created between the check and the delete trips the FK.
            Err(failure) if failure.diesel().is_some_and(is_foreign_key_violation) => {
                Err(FileRepositoryError::in_use(id))
            }
            Err(failure) => Err(map_failure(failure)),
        }
    }
}
