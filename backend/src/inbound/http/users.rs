//! Signed-in account handlers.
//!
//! ```text
//! GET /api/v1/users/me
//! ```

use actix_web::{get, web};

use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::UserResponse;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Return the account behind the session cookie.
///
/// A session whose account has since been deactivated is rejected with
/// `401`.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use portal::inbound::http::users::current_user;
///
/// let app = App::new().service(current_user);
/// ```
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserResponse>> {
    let caller = session.require_caller()?;
    let user = state.accounts.current_user(&caller).await?;
    Ok(web::Json(UserResponse::from(&user)))
}
