//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;
mod settings;
mod state_builders;

pub use config::ServerConfig;
#[cfg(feature = "metrics")]
pub(crate) use metrics::build_prometheus;
pub(crate) use settings::PortalSettings;
pub(crate) use state_builders::build_adapters;

#[cfg(feature = "metrics")]
use metrics::MetricsLayer;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

#[cfg(debug_assertions)]
use portal::doc::ApiDoc;
use portal::domain::{RateLimitPolicy, RateLimiter};
use portal::inbound::http::health::{HealthState, live, ready};
use portal::inbound::http::session::TrustProxy;
use portal::inbound::http::session_config::SessionSettings;
use portal::inbound::http::state::HttpState;
use portal::inbound::http::validation::{json_config, query_config};
use portal::inbound::http::{ApiLimits, api_scope};
use portal::middleware::{RateLimit, Trace};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Headroom for JSON bodies; uploads use the raw body limit instead.
const JSON_LIMIT_BYTES: usize = 256 * 1024;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    session: Arc<SessionSettings>,
    limiter: RateLimiter,
    rate_limit_enabled: bool,
    trust_proxy: bool,
}

impl AppDependencies {
    fn rate_limit(&self, policy: RateLimitPolicy) -> RateLimit {
        let limit = if self.rate_limit_enabled {
            RateLimit::new(self.limiter.clone(), policy)
        } else {
            RateLimit::disabled(policy)
        };
        limit.trust_proxy(self.trust_proxy)
    }
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let limits = ApiLimits {
        general: deps.rate_limit(RateLimitPolicy::general()),
        strict: deps.rate_limit(RateLimitPolicy::strict()),
    };
    let AppDependencies {
        health_state,
        http_state,
        session,
        trust_proxy,
        ..
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(TrustProxy(trust_proxy))
        .app_data(json_config(JSON_LIMIT_BYTES))
        .app_data(query_config())
        .wrap(Trace)
        .service(api_scope(session.middleware(), limits))
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server over prepared services.
///
/// The returned [`Server`] must be awaited to drive the listener;
/// `health_state` is marked ready once the socket is bound.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    limiter: RateLimiter,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        session,
        bind_addr,
        rate_limit_enabled,
        trust_proxy,
        #[cfg(feature = "metrics")]
        prometheus,
    } = config;

    #[cfg(feature = "metrics")]
    let metrics_layer = MetricsLayer::from_option(prometheus);

    let deps = AppDependencies {
        health_state: health_state.clone(),
        http_state,
        session: Arc::new(session),
        limiter,
        rate_limit_enabled,
        trust_proxy,
    };

    let server = HttpServer::new(move || {
        let app = build_app(deps.clone());

        #[cfg(feature = "metrics")]
        let app = app.wrap(metrics_layer.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
