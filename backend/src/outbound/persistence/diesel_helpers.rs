//! Shared helpers for Diesel repository implementations.
//!
//! - Pool and Diesel error mapping into per-port error constructors
//! - [`in_access_scope`], which opens a transaction and publishes the
//!   caller's identity to row-level security via `set_config`

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Bool, Text};
use diesel_async::scoped_futures::{ScopedBoxFuture, ScopedFutureExt};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::{AccessContext, PageQuery};

use super::pool::{DbPool, PoolError};

diesel::define_sql_function! {
    /// `set_config(setting_name, new_value, is_local)`.
    fn set_config(setting: Text, value: Text, is_local: Bool) -> Text;
}

/// Run `body` in a transaction whose `app.user_id` and `app.role` settings
/// describe `ctx`. Both settings are transaction-local, so a pooled
/// connection never leaks one caller's identity to the next.
pub(crate) async fn in_access_scope<'a, T, E, F>(
    conn: &mut AsyncPgConnection,
    ctx: &AccessContext,
    body: F,
) -> Result<T, E>
where
    T: Send + 'a,
    E: From<DieselError> + Send + 'a,
    F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, Result<T, E>>
        + Send
        + 'a,
{
    let user_id = ctx.user_id_setting();
    let role = ctx.role_name();
    conn.transaction(|conn| {
        async move {
            diesel::select((
                set_config("app.user_id", user_id, true),
                set_config("app.role", role, true),
            ))
            .execute(conn)
            .await?;
            body(conn).await
        }
        .scope_boxed()
    })
    .await
}

/// Why a scoped call failed before the repository could map it.
#[derive(Debug)]
pub(crate) enum DbFailure {
    Pool(PoolError),
    Diesel(DieselError),
}

impl From<DieselError> for DbFailure {
    fn from(value: DieselError) -> Self {
        Self::Diesel(value)
    }
}

impl DbFailure {
    /// The Diesel error, if the query itself failed.
    pub(crate) fn diesel(&self) -> Option<&DieselError> {
        match self {
            Self::Diesel(err) => Some(err),
            Self::Pool(_) => None,
        }
    }

    /// Convert into a port error with its `query` and `connection`
    /// constructors.
    pub(crate) fn into_port<E>(
        self,
        query: impl FnOnce(String) -> E,
        connection: impl FnOnce(String) -> E,
    ) -> E {
        match self {
            Self::Pool(err) => map_pool_error(err, connection),
            Self::Diesel(err) => map_diesel_error(
                err,
                |msg| query(msg.to_owned()),
                |msg| connection(msg.to_owned()),
            ),
        }
    }
}

/// Check out a connection and run `body` through [`in_access_scope`].
pub(crate) async fn run_scoped<'a, T, F>(
    pool: &DbPool,
    ctx: &AccessContext,
    body: F,
) -> Result<T, DbFailure>
where
    T: Send + 'a,
    F: for<'r> FnOnce(
            &'r mut AsyncPgConnection,
        ) -> ScopedBoxFuture<'a, 'r, Result<T, DieselError>>
        + Send
        + 'a,
{
    let mut conn = pool.get().await.map_err(DbFailure::Pool)?;
    in_access_scope(&mut conn, ctx, body)
        .await
        .map_err(DbFailure::Diesel)
}

/// Map pool errors into a repository-specific connection error.
pub(crate) fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map Diesel errors into query/connection constructors.
///
/// Database messages are logged at debug level and never copied into the
/// returned error, which can end up in an HTTP response.
pub(crate) fn map_diesel_error<E>(
    error: DieselError,
    query: impl FnOnce(&'static str) -> E,
    connection: impl FnOnce(&'static str) -> E,
) -> E {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        _ => query("database error"),
    }
}

/// Constraint name when `error` is a unique violation.
pub(crate) fn unique_violation(error: &DieselError) -> Option<&str> {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            Some(info.constraint_name().unwrap_or_default())
        }
        _ => None,
    }
}

pub(crate) fn is_foreign_key_violation(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
    )
}

/// `LIMIT` for a keyset page: one extra row reveals whether more follow.
pub(crate) fn fetch_limit(page: &PageQuery) -> i64 {
    i64::try_from(page.fetch_limit()).unwrap_or(i64::MAX)
}

/// Postgres `count(*)` is `i64`; negative values cannot occur.
pub(crate) fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}
