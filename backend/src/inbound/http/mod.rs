//! HTTP inbound adapter exposing REST endpoints.
//!
//! Everything under `/api/v1` runs behind the session cookie and the
//! general rate limit; `/auth` and `/shared` also pass the strict limit.
//! Signed-in requests are re-checked against the account's active flag.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::dev::HttpServiceFactory;
use actix_web::web;

use crate::middleware::RateLimit;

use self::active_account::ActiveAccount;

pub mod active_account;
pub mod admin;
pub mod auth;
pub mod error;
pub mod events;
pub mod files;
pub mod health;
pub mod notifications;
pub mod professionals;
pub mod reports;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod share_links;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

pub use error::ApiResult;

/// Rate limits applied to the API scope.
#[derive(Clone)]
pub struct ApiLimits {
    pub general: RateLimit,
    pub strict: RateLimit,
}

/// The `/api/v1` scope with its middleware.
///
/// Handlers read [`state::HttpState`] and [`session::TrustProxy`] from app
/// data registered by the caller.
pub fn api_scope(
    session: SessionMiddleware<CookieSessionStore>,
    limits: ApiLimits,
) -> impl HttpServiceFactory {
    let ApiLimits { general, strict } = limits;
    web::scope("/api/v1")
        .service(auth::scope().wrap(strict.clone()))
        .service(share_links::shared_scope().wrap(strict))
        .configure(routes)
        .wrap(ActiveAccount)
        .wrap(session)
        .wrap(general)
}

/// Authenticated routes. Literal segments precede `{id}` captures.
fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(users::current_user)
        .service(files::upload_file)
        .service(files::list_files)
        .service(files::download_file)
        .service(files::delete_file)
        .service(reports::send_batch)
        .service(reports::list_sent)
        .service(reports::list_received)
        .service(reports::send_report)
        .service(reports::get_report)
        .service(reports::job_status)
        .service(notifications::list_notifications)
        .service(notifications::archive_notification)
        .service(events::create_event)
        .service(events::list_events)
        .service(events::get_event)
        .service(events::update_event)
        .service(events::delete_event)
        .service(professionals::create_professional)
        .service(professionals::list_professionals)
        .service(professionals::delete_professional)
        .service(share_links::create_share_link)
        .service(share_links::list_share_links)
        .service(share_links::revoke_share_link)
        .service(admin::list_users)
        .service(admin::update_user)
        .service(admin::audit_log)
        .service(admin::stats);
}
