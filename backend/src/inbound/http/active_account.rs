//! Re-validates the account behind every signed-in request.
//!
//! Session cookies only carry the account id and role. Without a lookup an
//! account switched off by an administrator would keep working until its
//! cookie expired. [`ActiveAccount`] asks [`Accounts::current_user`] on each
//! request that carries an identity; when the account is missing or
//! inactive the identity is dropped from the session and the handler sees
//! an anonymous caller.

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError, web};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::info;

use crate::domain::ports::Accounts as _;
use crate::domain::{Caller, ErrorCode};

use super::session::SessionContext;
use super::state::HttpState;

/// Middleware factory; must sit inside the session middleware.
#[derive(Clone, Copy, Debug, Default)]
pub struct ActiveAccount;

impl<S, B> Transform<S, ServiceRequest> for ActiveAccount
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ActiveAccountMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ActiveAccountMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Service produced by [`ActiveAccount`].
pub struct ActiveAccountMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ActiveAccountMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let session = SessionContext::new(req.get_session(), String::new());
        Box::pin(async move {
            let access = match session.access() {
                Ok(access) => access,
                Err(error) => {
                    return Ok(req.into_response(error.error_response()).map_into_right_body());
                }
            };
            if let (Some(state), Some(access)) = (state, access) {
                match state.accounts.current_user(&Caller::new(access, None)).await {
                    Ok(_) => {}
                    Err(error) if error.code() == ErrorCode::Unauthorized => {
                        info!(user_id = ?access.user_id(), "session of inactive account dropped");
                        session.forget_identity();
                    }
                    Err(error) => {
                        return Ok(req.into_response(error.error_response()).map_into_right_body());
                    }
                }
            }
            Ok(service.call(req).await?.map_into_left_body())
        })
    }
}
