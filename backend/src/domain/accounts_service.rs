//! Registration, login and the signed-in account.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{Accounts, UserRepository};
use crate::domain::{
    AccessContext, AuditAction, AuditEntry, AuditLogger, Caller, Email, Error, Password,
    PasswordDigest, Registration, User,
};

const INVALID_CREDENTIALS: &str = "invalid credentials";

/// Account service implementing [`Accounts`].
#[derive(Clone)]
pub struct AccountsService {
    users: Arc<dyn UserRepository>,
    audit: AuditLogger,
    clock: Arc<dyn Clock>,
}

impl AccountsService {
    /// Build the service over the user repository.
    pub fn new(users: Arc<dyn UserRepository>, audit: AuditLogger, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            audit,
            clock,
        }
    }

    async fn reject_login(&self, caller: &Caller, email: &str, user_id: Option<Uuid>) -> Error {
        self.audit
            .record(
                AuditEntry::new(AuditAction::LoginFailed, "user")
                    .actor(user_id)
                    .ip(caller.ip())
                    .metadata(json!({ "email": email })),
            )
            .await;
        Error::unauthorized(INVALID_CREDENTIALS)
    }
}

/// Argon2 is CPU-bound; run it on the blocking pool.
async fn hash_password(password: Password) -> Result<PasswordDigest, Error> {
    tokio::task::spawn_blocking(move || password.hash())
        .await
        .map_err(|err| Error::internal(format!("password hashing task failed: {err}")))?
        .map_err(|err| Error::internal(err.to_string()))
}

async fn verify_password(digest: PasswordDigest, password: Password) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || digest.verify(&password))
        .await
        .map_err(|err| Error::internal(format!("password check task failed: {err}")))
}

#[async_trait]
impl Accounts for AccountsService {
    async fn register(&self, caller: &Caller, registration: Registration) -> Result<User, Error> {
        let Registration {
            email,
            display_name,
            role,
            password,
        } = registration;
        let digest = hash_password(password).await?;
        let user = User {
            id: Uuid::new_v4(),
            email,
            display_name,
            role,
            active: true,
            password: digest,
            created_at: self.clock.utc(),
        };
        self.users.create(&AccessContext::system(), &user).await?;
        info!(user_id = %user.id, role = %user.role, "account registered");
        self.audit
            .record(
                AuditEntry::new(AuditAction::UserRegistered, "user")
                    .actor(Some(user.id))
                    .resource(user.id)
                    .ip(caller.ip())
                    .metadata(json!({ "role": user.role })),
            )
            .await;
        Ok(user)
    }

    async fn login(&self, caller: &Caller, email: &str, password: Password) -> Result<User, Error> {
        let Ok(email) = Email::parse(email) else {
            return Err(self.reject_login(caller, email, None).await);
        };
        let found = self
            .users
            .find_by_email(&AccessContext::system(), &email)
            .await?;
        let user = match found {
            Some(user) if user.active => user,
            Some(user) => return Err(self.reject_login(caller, email.as_str(), Some(user.id)).await),
            None => return Err(self.reject_login(caller, email.as_str(), None).await),
        };
        if !verify_password(user.password.clone(), password).await? {
            return Err(self.reject_login(caller, email.as_str(), Some(user.id)).await);
        }
        self.audit
            .record(
                AuditEntry::new(AuditAction::LoginSucceeded, "user")
                    .actor(Some(user.id))
                    .resource(user.id)
                    .ip(caller.ip()),
            )
            .await;
        Ok(user)
    }

    async fn current_user(&self, caller: &Caller) -> Result<User, Error> {
        let id = caller.access.require_user()?;
        match self.users.find_by_id(&caller.access, id).await? {
            Some(user) if user.active => Ok(user),
            _ => Err(Error::unauthorized("login required")),
        }
    }
}
