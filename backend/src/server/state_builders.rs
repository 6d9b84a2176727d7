//! Adapter selection from settings.
//!
//! Each driven concern falls back to its in-memory adapter when its
//! external dependency is not configured, so a bare `cargo run` serves a
//! working (non-persistent) portal.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use mockable::Clock;
use tracing::{info, warn};

use portal::domain::StorageBackend;
use portal::domain::ports::FileStorage;
use portal::outbound::cache::{RedisKeyValueStore, RedisPool, RedisPoolConfig};
use portal::outbound::persistence::{
    DbPool, DieselAuditRepository, DieselFileRepository, DieselHealthEventRepository,
    DieselNotificationRepository, DieselProfessionalRepository, DieselReportRepository,
    DieselShareLinkRepository, DieselUserRepository, PoolConfig, run_pending_migrations,
};
use portal::outbound::queue::RedisJobQueue;
use portal::outbound::storage::{CloudinaryConfig, CloudinaryFileStorage, LocalFileStorage};
use portal::wiring::Adapters;

use super::settings::PortalSettings;

const CLOUDINARY_TIMEOUT: Duration = Duration::from_secs(30);

fn build_storage(settings: &PortalSettings, clock: Arc<dyn Clock>) -> Result<Arc<dyn FileStorage>> {
    match settings.storage_backend()? {
        StorageBackend::Local => {
            let root = settings.storage_root();
            let storage = LocalFileStorage::open(&root)
                .wrap_err_with(|| format!("open storage root {}", root.display()))?;
            info!(root = %root.display(), "using local file storage");
            Ok(Arc::new(storage))
        }
        StorageBackend::Cloudinary => {
            let credentials = settings.cloudinary()?;
            let storage = CloudinaryFileStorage::new(
                CloudinaryConfig {
                    cloud_name: credentials.cloud_name,
                    api_key: credentials.api_key,
                    api_secret: credentials.api_secret,
                    timeout: CLOUDINARY_TIMEOUT,
                },
                clock,
            )
            .wrap_err("build Cloudinary client")?;
            info!("using Cloudinary file storage");
            Ok(Arc::new(storage))
        }
    }
}

async fn attach_database(adapters: &mut Adapters, settings: &PortalSettings, url: &str) -> Result<()> {
    if settings.run_migrations() {
        run_pending_migrations(url)
            .await
            .wrap_err("apply database migrations")?;
    }
    let pool = DbPool::new(PoolConfig::new(url))
        .await
        .wrap_err("build database pool")?;
    adapters.users = Arc::new(DieselUserRepository::new(pool.clone()));
    adapters.files = Arc::new(DieselFileRepository::new(pool.clone()));
    adapters.reports = Arc::new(DieselReportRepository::new(pool.clone()));
    adapters.notifications = Arc::new(DieselNotificationRepository::new(pool.clone()));
    adapters.events = Arc::new(DieselHealthEventRepository::new(pool.clone()));
    adapters.professionals = Arc::new(DieselProfessionalRepository::new(pool.clone()));
    adapters.share_links = Arc::new(DieselShareLinkRepository::new(pool.clone()));
    adapters.audit = Arc::new(DieselAuditRepository::new(pool));
    info!("using PostgreSQL repositories");
    Ok(())
}

async fn attach_redis(adapters: &mut Adapters, url: &str) -> Result<()> {
    let pool = RedisPool::new(RedisPoolConfig::new(url))
        .await
        .wrap_err("build Redis pool")?;
    adapters.key_value = Arc::new(RedisKeyValueStore::new(pool.clone()));
    adapters.queue = Arc::new(RedisJobQueue::new(pool));
    info!("using Redis cache and job queue");
    Ok(())
}

/// Build the adapter set described by `settings`.
///
/// # Errors
///
/// Fails when storage cannot be opened, migrations fail, or a configured
/// pool cannot be built.
pub(crate) async fn build_adapters(
    settings: &PortalSettings,
    clock: Arc<dyn Clock>,
) -> Result<Adapters> {
    let storage = build_storage(settings, clock)?;
    let mut adapters = Adapters::in_memory(storage);

    match settings.database_url.as_deref() {
        Some(url) => attach_database(&mut adapters, settings, url).await?,
        None => warn!("PORTAL_DATABASE_URL unset; data lives in memory only"),
    }
    match settings.redis_url.as_deref() {
        Some(url) => attach_redis(&mut adapters, url).await?,
        None => warn!("PORTAL_REDIS_URL unset; cache, limits and jobs are in-process"),
    }
    Ok(adapters)
}
