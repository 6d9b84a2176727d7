//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`);
//! compiled only for tests or with the `test-support` feature.

pub mod clock;

pub mod portal {
    //! An in-memory portal for end-to-end HTTP tests.
    //!
    //! Every adapter is the in-process variant, files land in a temporary
    //! directory, and time comes from a [`MutableClock`] the test controls.

    use std::sync::Arc;

    use actix_web::cookie::{Key, SameSite};
    use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
    use actix_web::{App, web};
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    use uuid::Uuid;

    use crate::domain::{
        AccessContext, CircuitBreakerConfig, DisplayName, Email, JobWorker, JobWorkerConfig,
        Password, RateLimitPolicy, RateLimiter, Role, User,
    };
    use crate::domain::ports::UserRepository as _;
    use crate::inbound::http::health::{HealthState, live, ready};
    use crate::inbound::http::session::TrustProxy;
    use crate::inbound::http::session_config::SessionSettings;
    use crate::inbound::http::state::{DEFAULT_MAX_UPLOAD_BYTES, HttpState};
    use crate::inbound::http::validation::{json_config, query_config};
    use crate::inbound::http::{ApiLimits, api_scope};
    use crate::middleware::{RateLimit, Trace};
    use crate::outbound::storage::LocalFileStorage;
    use crate::test_support::clock::MutableClock;
    use crate::wiring::{Adapters, ServiceOptions, Services};

    /// Share URL prefix used by the harness.
    pub const SHARE_BASE_URL: &str = "http://portal.test/api/v1/shared";

    /// Fixed starting instant for harness clocks.
    pub fn epoch() -> DateTime<Utc> {
        match Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0) {
            chrono::LocalResult::Single(at) => at,
            other => panic!("invalid harness epoch: {other:?}"),
        }
    }

    /// Fully wired in-memory portal.
    pub struct TestPortal {
        pub http: HttpState,
        pub worker: JobWorker,
        pub limiter: RateLimiter,
        pub adapters: Adapters,
        pub clock: Arc<MutableClock>,
        rate_limited: bool,
        key: Key,
        _root: TempDir,
    }

    impl TestPortal {
        /// Portal with rate limiting switched off.
        pub fn new() -> Self {
            Self::build(false)
        }

        /// Portal enforcing the general and strict limits.
        pub fn rate_limited() -> Self {
            Self::build(true)
        }

        fn build(rate_limited: bool) -> Self {
            let root = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
            let storage = LocalFileStorage::open(root.path())
                .unwrap_or_else(|err| panic!("open local storage: {err}"));
            let adapters = Adapters::in_memory(Arc::new(storage));
            let clock = Arc::new(MutableClock::new(epoch()));
            let Services {
                http,
                worker,
                limiter,
            } = Services::build(
                &adapters,
                &ServiceOptions {
                    share_base_url: SHARE_BASE_URL.to_owned(),
                    max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                    breaker: CircuitBreakerConfig::default(),
                    worker: JobWorkerConfig::default(),
                },
                clock.clone(),
            );
            Self {
                http,
                worker,
                limiter,
                adapters,
                clock,
                rate_limited,
                key: Key::generate(),
                _root: root,
            }
        }

        /// Insert an active admin account directly; admins cannot
        /// self-register.
        pub async fn seed_admin(&self, email: &str, password: &str) -> User {
            let digest = Password::new(password)
                .unwrap_or_else(|err| panic!("admin password: {err}"))
                .hash()
                .unwrap_or_else(|err| panic!("hash admin password: {err}"));
            let user = User {
                id: Uuid::new_v4(),
                email: Email::parse(email).unwrap_or_else(|err| panic!("admin email: {err}")),
                display_name: DisplayName::parse("Portal Admin")
                    .unwrap_or_else(|err| panic!("admin name: {err}")),
                role: Role::Admin,
                active: true,
                password: digest,
                created_at: epoch(),
            };
            self.adapters
                .users
                .create(&AccessContext::system(), &user)
                .await
                .unwrap_or_else(|err| panic!("seed admin: {err}"));
            user
        }

        fn rate_limit(&self, policy: RateLimitPolicy) -> RateLimit {
            let limit = if self.rate_limited {
                RateLimit::new(self.limiter.clone(), policy)
            } else {
                RateLimit::disabled(policy)
            };
            limit.trust_proxy(true)
        }

        /// The application as the server assembles it, minus Swagger and
        /// metrics. Cookies are not marked secure so the test client keeps
        /// them.
        pub fn app(
            &self,
        ) -> App<
            impl ServiceFactory<
                ServiceRequest,
                Config = (),
                Response = ServiceResponse,
                Error = actix_web::Error,
                InitError = (),
            > + use<>,
        > {
            let session = SessionSettings {
                key: self.key.clone(),
                cookie_secure: false,
                same_site: SameSite::Lax,
            };
            let health = HealthState::new();
            health.mark_ready();
            App::new()
                .app_data(web::Data::new(health))
                .app_data(web::Data::new(self.http.clone()))
                .app_data(TrustProxy(true))
                .app_data(json_config(256 * 1024))
                .app_data(query_config())
                .wrap(Trace)
                .service(api_scope(
                    session.middleware(),
                    ApiLimits {
                        general: self.rate_limit(RateLimitPolicy::general()),
                        strict: self.rate_limit(RateLimitPolicy::strict()),
                    },
                ))
                .service(ready)
                .service(live)
        }
    }

    impl Default for TestPortal {
        fn default() -> Self {
            Self::new()
        }
    }
}
