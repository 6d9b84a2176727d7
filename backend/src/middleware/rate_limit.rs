//! Fixed-window rate limiting for HTTP scopes.
//!
//! Wrap a scope with [`RateLimit`] to count requests per client IP against a
//! [`RateLimitPolicy`]. Limited requests are answered with `429` and a
//! `Retry-After` header before reaching the handler. Store failures are
//! absorbed by [`RateLimiter`], so an unavailable store never blocks
//! traffic.

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde_json::json;
use tracing::info;

use crate::domain::{Error as DomainError, RateLimitDecision, RateLimitPolicy, RateLimiter};

use super::client_ip::client_ip;

/// Middleware factory enforcing one policy.
///
/// ```
/// use actix_web::{App, web};
/// use std::sync::Arc;
/// use portal::domain::{RateLimitPolicy, RateLimiter};
/// use portal::middleware::RateLimit;
/// use portal::outbound::memory::MemoryKeyValueStore;
///
/// let limiter = RateLimiter::new(Arc::new(MemoryKeyValueStore::new()));
/// let _app = App::new().service(
///     web::scope("/api").wrap(RateLimit::new(limiter, RateLimitPolicy::general())),
/// );
/// ```
#[derive(Clone)]
pub struct RateLimit {
    limiter: Option<RateLimiter>,
    policy: Rc<RateLimitPolicy>,
    trust_proxy: bool,
}

impl RateLimit {
    /// Enforce `policy` through `limiter`.
    pub fn new(limiter: RateLimiter, policy: RateLimitPolicy) -> Self {
        Self {
            limiter: Some(limiter),
            policy: Rc::new(policy),
            trust_proxy: false,
        }
    }

    /// Pass-through middleware used when limiting is switched off.
    pub fn disabled(policy: RateLimitPolicy) -> Self {
        Self {
            limiter: None,
            policy: Rc::new(policy),
            trust_proxy: false,
        }
    }

    /// Read the client IP from `X-Forwarded-For` when present.
    #[must_use]
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            policy: Rc::clone(&self.policy),
            trust_proxy: self.trust_proxy,
        }))
    }
}

/// Service produced by [`RateLimit`].
pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: Option<RateLimiter>,
    policy: Rc<RateLimitPolicy>,
    trust_proxy: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
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
        let Some(limiter) = self.limiter.clone() else {
            return Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) });
        };
        let policy = Rc::clone(&self.policy);
        let client = client_ip(req.request(), self.trust_proxy);
        Box::pin(async move {
            match limiter.check(&policy, &client).await {
                RateLimitDecision::Allowed { .. } => {
                    Ok(service.call(req).await?.map_into_left_body())
                }
                RateLimitDecision::Limited { retry_after } => {
                    let seconds = retry_after.as_secs().max(1);
                    info!(
                        policy = policy.name,
                        %client,
                        retry_after = seconds,
                        "request rate limited"
                    );
                    let error = DomainError::too_many_requests("too many requests")
                        .with_details(json!({ "retryAfter": seconds }));
                    Ok(req.into_response(error.error_response()).map_into_right_body())
                }
            }
        })
    }
}
