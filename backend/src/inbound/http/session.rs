//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Provides a thin wrapper around Actix sessions so handlers only deal with
//! domain values: the signed-in account's id and role, and a [`Caller`]
//! carrying the client IP for audit records.

use std::str::FromStr;

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::domain::{AccessContext, Caller, Error, Role, User};
use crate::middleware::client_ip;

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const ROLE_KEY: &str = "role";

/// Whether client IPs may be read from `X-Forwarded-For`.
///
/// Registered as app data; absent means the peer address is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrustProxy(pub bool);

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext {
    session: Session,
    ip: String,
}

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session, ip: impl Into<String>) -> Self {
        Self {
            session,
            ip: ip.into(),
        }
    }

    /// Start a fresh session for `user`, rotating the cookie.
    pub fn persist_user(&self, user: &User) -> Result<(), Error> {
        self.session.renew();
        self.session
            .insert(USER_ID_KEY, user.id.to_string())
            .and_then(|()| self.session.insert(ROLE_KEY, user.role.as_str()))
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Drop every session value and expire the cookie.
    pub fn clear(&self) {
        self.session.purge();
    }

    /// Remove the signed-in identity but keep the session usable, so a
    /// later login in the same request can still write a fresh cookie.
    pub fn forget_identity(&self) {
        self.session.remove(USER_ID_KEY);
        self.session.remove(ROLE_KEY);
    }

    /// Access context for the signed-in account, if any.
    ///
    /// Tampered or stale values read as signed out.
    pub fn access(&self) -> Result<Option<AccessContext>, Error> {
        let read = |key: &str| {
            self.session
                .get::<String>(key)
                .map_err(|error| Error::internal(format!("failed to read session: {error}")))
        };
        let (Some(raw_id), Some(raw_role)) = (read(USER_ID_KEY)?, read(ROLE_KEY)?) else {
            return Ok(None);
        };
        match (Uuid::parse_str(&raw_id), Role::from_str(&raw_role)) {
            (Ok(id), Ok(role)) => Ok(Some(AccessContext::user(id, role))),
            _ => {
                tracing::warn!("invalid identity in session cookie");
                Ok(None)
            }
        }
    }

    /// Caller for public endpoints: signed in or anonymous.
    pub fn caller(&self) -> Result<Caller, Error> {
        let ip = Some(self.ip.clone());
        Ok(match self.access()? {
            Some(access) => Caller::new(access, ip),
            None => Caller::anonymous(ip),
        })
    }

    /// Require a signed-in caller or return `401 Unauthorized`.
    pub fn require_caller(&self) -> Result<Caller, Error> {
        let access = self
            .access()?
            .ok_or_else(|| Error::unauthorized("login required"))?;
        Ok(Caller::new(access, Some(self.ip.clone())))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let trust = req.app_data::<TrustProxy>().copied().unwrap_or_default();
        let ip = client_ip(req, trust.0);
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(|session| Self::new(session, ip)) })
    }
}
