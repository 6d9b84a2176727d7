//! Service graph assembly.
//!
//! [`Adapters`] bundles one implementation of every driven port. The
//! server fills it with PostgreSQL, Redis and the configured file store;
//! development runs and end-to-end tests use [`Adapters::in_memory`]. Both
//! then derive the HTTP state and the job worker from the same graph.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    AuditRepository, FileRepository, FileStorage, HealthEventRepository, JobQueue,
    JobStatusStore, KeyValueStore, NotificationRepository, ProfessionalRepository,
    ReportRepository, ShareLinkRepository, UserRepository,
};
use crate::domain::{
    AccountsService, AdministrationService, AuditLogger, CacheAside, CalendarPorts,
    CircuitBreaker, CircuitBreakerConfig, FilesService, HealthEventsService, JobWorker,
    JobWorkerConfig, JobWorkerPorts, NotificationsService, ProfessionalsService, RateLimiter,
    ReportsPorts, ReportsService, ShareLinksService,
};
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::outbound::memory::{MemoryDatabase, MemoryJobQueue, MemoryKeyValueStore};
use crate::outbound::queue::KeyValueJobStatusStore;

/// Name under which the storage breaker keeps its Redis keys.
pub const STORAGE_BREAKER: &str = "storage";

/// One implementation per driven port.
#[derive(Clone)]
pub struct Adapters {
    pub users: Arc<dyn UserRepository>,
    pub files: Arc<dyn FileRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub events: Arc<dyn HealthEventRepository>,
    pub professionals: Arc<dyn ProfessionalRepository>,
    pub share_links: Arc<dyn ShareLinkRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub key_value: Arc<dyn KeyValueStore>,
    pub queue: Arc<dyn JobQueue>,
    pub storage: Arc<dyn FileStorage>,
}

impl Adapters {
    /// Every repository on one [`MemoryDatabase`], with in-process cache and
    /// queue.
    pub fn in_memory(storage: Arc<dyn FileStorage>) -> Self {
        let db = MemoryDatabase::new();
        Self {
            users: Arc::new(db.clone()),
            files: Arc::new(db.clone()),
            reports: Arc::new(db.clone()),
            notifications: Arc::new(db.clone()),
            events: Arc::new(db.clone()),
            professionals: Arc::new(db.clone()),
            share_links: Arc::new(db.clone()),
            audit: Arc::new(db),
            key_value: Arc::new(MemoryKeyValueStore::new()),
            queue: Arc::new(MemoryJobQueue::new()),
            storage,
        }
    }
}

/// Knobs that shape the services rather than select adapters.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Prefix for share URLs, e.g. `https://portal.example/shared`.
    pub share_base_url: String,
    pub max_upload_bytes: usize,
    pub breaker: CircuitBreakerConfig,
    pub worker: JobWorkerConfig,
}

/// Domain services built over one set of adapters.
pub struct Services {
    pub http: HttpState,
    pub worker: JobWorker,
    pub limiter: RateLimiter,
}

impl Services {
    /// Assemble every service over `adapters`.
    pub fn build(adapters: &Adapters, options: &ServiceOptions, clock: Arc<dyn Clock>) -> Self {
        let audit = AuditLogger::new(Arc::clone(&adapters.audit), Arc::clone(&clock));
        let cache = CacheAside::new(Arc::clone(&adapters.key_value));
        let statuses: Arc<dyn JobStatusStore> = Arc::new(KeyValueJobStatusStore::new(
            Arc::clone(&adapters.key_value),
        ));
        let breaker = CircuitBreaker::new(
            STORAGE_BREAKER,
            options.breaker.clone(),
            Arc::clone(&adapters.key_value),
        );

        let reports: Arc<ReportsService> = Arc::new(ReportsService::new(
            ReportsPorts {
                users: Arc::clone(&adapters.users),
                files: Arc::clone(&adapters.files),
                reports: Arc::clone(&adapters.reports),
                queue: Arc::clone(&adapters.queue),
                statuses: Arc::clone(&statuses),
            },
            audit.clone(),
            cache.clone(),
            Arc::clone(&clock),
        ));

        let http = HttpState::with_upload_limit(
            HttpStatePorts {
                accounts: Arc::new(AccountsService::new(
                    Arc::clone(&adapters.users),
                    audit.clone(),
                    Arc::clone(&clock),
                )),
                admin: Arc::new(AdministrationService::new(
                    Arc::clone(&adapters.users),
                    Arc::clone(&adapters.reports),
                    Arc::clone(&adapters.audit),
                    audit.clone(),
                    cache.clone(),
                )),
                files: Arc::new(FilesService::new(
                    Arc::clone(&adapters.files),
                    Arc::clone(&adapters.storage),
                    breaker,
                    audit.clone(),
                    Arc::clone(&clock),
                )),
                reports: reports.clone(),
                notifications: Arc::new(NotificationsService::new(
                    Arc::clone(&adapters.notifications),
                    audit.clone(),
                    cache.clone(),
                    Arc::clone(&clock),
                )),
                events: Arc::new(HealthEventsService::new(
                    CalendarPorts {
                        events: Arc::clone(&adapters.events),
                        professionals: Arc::clone(&adapters.professionals),
                        files: Arc::clone(&adapters.files),
                        notifications: Arc::clone(&adapters.notifications),
                        reports: Arc::clone(&adapters.reports),
                    },
                    audit.clone(),
                    cache,
                    Arc::clone(&clock),
                )),
                professionals: Arc::new(ProfessionalsService::new(
                    Arc::clone(&adapters.professionals),
                    audit.clone(),
                    Arc::clone(&clock),
                )),
                share_links: Arc::new(ShareLinksService::new(
                    Arc::clone(&adapters.share_links),
                    Arc::clone(&adapters.files),
                    Arc::clone(&adapters.storage),
                    audit,
                    Arc::clone(&clock),
                    options.share_base_url.clone(),
                )),
            },
            options.max_upload_bytes,
        );

        let worker = JobWorker::new(
            JobWorkerPorts {
                queue: Arc::clone(&adapters.queue),
                statuses,
                reports,
                links: Arc::clone(&adapters.share_links),
            },
            clock,
            options.worker,
        );

        Self {
            http,
            worker,
            limiter: RateLimiter::new(Arc::clone(&adapters.key_value)),
        }
    }
}
