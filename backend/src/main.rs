#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), forbid(clippy::expect_used))]
//! Backend entry-point: loads settings, assembles services, runs the job
//! worker alongside the HTTP server, and drains both on shutdown.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use mockable::{Clock, DefaultClock, DefaultEnv};
use ortho_config::OrthoConfig;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use portal::domain::{CircuitBreakerConfig, JobWorkerConfig};
use portal::inbound::http::health::HealthState;
use portal::inbound::http::session_config::{BuildMode, session_settings_from_env};
use portal::wiring::{ServiceOptions, Services};
#[cfg(feature = "metrics")]
use server::build_prometheus;
use server::{PortalSettings, ServerConfig, build_adapters, create_server};

fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let settings = PortalSettings::load().wrap_err("load portal settings")?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .wrap_err("load session settings")?;
    let bind_addr = settings.bind_addr()?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let adapters = build_adapters(&settings, Arc::clone(&clock)).await?;
    let Services {
        http,
        worker,
        limiter,
    } = Services::build(
        &adapters,
        &ServiceOptions {
            share_base_url: settings.share_base_url(),
            max_upload_bytes: settings.max_upload_bytes(),
            breaker: CircuitBreakerConfig::default(),
            worker: JobWorkerConfig {
                poll_interval: settings.worker_poll_interval(),
                ..JobWorkerConfig::default()
            },
        },
        clock,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let config = ServerConfig::new(session, bind_addr)
        .with_rate_limits(settings.rate_limit_enabled())
        .with_trust_proxy(settings.trust_proxy());
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(build_prometheus());

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), web::Data::new(http), limiter, config)
        .wrap_err_with(|| format!("bind {bind_addr}"))?;
    info!(%bind_addr, "portal listening");

    let served = server.await;

    health_state.mark_unhealthy();
    if shutdown_tx.send(true).is_err() {
        warn!("job worker exited before shutdown");
    }
    if let Err(error) = worker_task.await {
        warn!(%error, "job worker task failed");
    }
    info!("portal stopped");
    served.wrap_err("HTTP server failed")
}
