//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{AccessContext, Email, PageQuery, Role, User};

use super::diesel_helpers::{DbFailure, fetch_limit, run_scoped, to_count, unique_violation};
use super::models::{CorruptRow, NewUserRow, UserRow, decode_all};
use super::pool::DbPool;
use super::schema::users;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: DbFailure) -> UserRepositoryError {
    failure.into_port(UserRepositoryError::query, UserRepositoryError::connection)
}

fn map_corrupt(error: CorruptRow) -> UserRepositoryError {
    UserRepositoryError::query(error.to_string())
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(&self, ctx: &AccessContext, user: &User) -> Result<(), UserRepositoryError> {
        let row = NewUserRow::from(user);
        let result = run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::insert_into(users::table)
                    .values(&row)
                    .execute(conn)
                    .await
            }
            .scope_boxed()
        })
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(failure) if failure.diesel().and_then(unique_violation).is_some() => {
                Err(UserRepositoryError::duplicate_email(user.email.as_str()))
            }
            Err(failure) => Err(map_failure(failure)),
        }
    }

    async fn find_by_id(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<User>, UserRepositoryError> {
        let row = run_scoped(&self.pool, ctx, |conn| {
            async move {
                users::table
                    .find(id)
                    .select(UserRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        row.map(User::try_from).transpose().map_err(map_corrupt)
    }

    async fn find_by_email(
        &self,
        ctx: &AccessContext,
        email: &Email,
    ) -> Result<Option<User>, UserRepositoryError> {
        let email = email.as_str().to_owned();
        let row = run_scoped(&self.pool, ctx, |conn| {
            async move {
                users::table
                    .filter(users::email.eq(email))
                    .select(UserRow::as_select())
                    .first(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        row.map(User::try_from).transpose().map_err(map_corrupt)
    }

    async fn list(
        &self,
        ctx: &AccessContext,
        role: Option<Role>,
        page: &PageQuery,
    ) -> Result<Vec<User>, UserRepositoryError> {
        let cursor = page.cursor().copied();
        let limit = fetch_limit(page);
        let rows: Vec<UserRow> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                let mut query = users::table.select(UserRow::as_select()).into_boxed();
                if let Some(role) = role {
                    query = query.filter(users::role.eq(role.as_str()));
                }
                if let Some(key) = cursor {
                    query = query.filter(
                        users::created_at
                            .lt(key.at)
                            .or(users::created_at.eq(key.at).and(users::id.lt(key.id))),
                    );
                }
                query
                    .order_by((users::created_at.desc(), users::id.desc()))
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

    async fn set_active(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        active: bool,
    ) -> Result<Option<User>, UserRepositoryError> {
        let row = run_scoped(&self.pool, ctx, |conn| {
            async move {
                diesel::update(users::table.find(id))
                    .set(users::active.eq(active))
                    .returning(UserRow::as_returning())
                    .get_result(conn)
                    .await
                    .optional()
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        row.map(User::try_from).transpose().map_err(map_corrupt)
    }

    async fn count_by_role(
        &self,
        ctx: &AccessContext,
    ) -> Result<Vec<(Role, u64)>, UserRepositoryError> {
        let rows: Vec<(String, i64)> = run_scoped(&self.pool, ctx, |conn| {
            async move {
                users::table
                    .group_by(users::role)
                    .select((users::role, count_star()))
                    .load(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_failure)?;
        Ok(rows
            .into_iter()
            .filter_map(|(role, count)| match role.parse::<Role>() {
                Ok(role) => Some((role, to_count(count))),
                Err(_) => {
                    warn!(role, "skipping unknown role in counts");
                    None
                }
            })
            .collect())
    }
}

