//! Domain entities, validation, and use-case services.
//!
//! Purpose: hold the portal's business rules independent of HTTP, SQL, and
//! Redis. Services implement the driving ports in [`ports`] and talk to
//! the outside world only through the driven ports defined there.
//!
//! Public surface:
//! - Entities: [`User`], [`StoredFile`], [`Report`], [`Notification`],
//!   [`HealthEvent`], [`Professional`], [`ShareLink`], [`AuditRecord`],
//!   [`Job`] and [`JobStatus`].
//! - Services: one per driving port, e.g. [`ReportsService`].
//! - Infrastructure helpers shared by services and middleware:
//!   [`CacheAside`], [`RateLimiter`], [`CircuitBreaker`], [`AuditLogger`].
//! - [`Error`] and [`ErrorCode`], the only error surfaced to handlers.

pub mod ports;

mod access;
mod accounts_service;
mod admin_service;
mod audit;
pub mod cache;
mod calendar_service;
pub mod circuit_breaker;
pub mod error;
mod file;
mod files_service;
mod health_event;
mod job;
mod job_worker;
mod notifications_service;
mod page;
mod professional;
pub mod rate_limit;
mod report;
mod reports_service;
mod share_link;
mod share_links_service;
mod trace_id;
pub mod user;

pub use self::access::{AccessContext, AccessRole, Caller};
pub use self::accounts_service::AccountsService;
pub use self::admin_service::AdministrationService;
pub use self::audit::{AuditAction, AuditEntry, AuditFilter, AuditLogger, AuditRecord};
pub use self::cache::{CacheAside, CacheKey, CacheKeyError, STATS_TAG, user_tag};
pub use self::calendar_service::{CalendarPorts, HealthEventsService, ProfessionalsService};
pub use self::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitError};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::file::{
    ALLOWED_CONTENT_TYPES, FILE_NAME_MAX, FileContent, StorageBackend, StoredFile, Upload,
    UploadValidationError, storage_key,
};
pub use self::files_service::FilesService;
pub use self::health_event::{
    EVENT_DESCRIPTION_MAX, EVENT_FILES_MAX, EVENT_TITLE_MAX, EventDraft, EventKind, EventRange,
    EventValidationError, HealthEvent,
};
pub use self::job::{Job, JobPayload, JobState, JobStatus};
pub use self::job_worker::{JobWorker, JobWorkerConfig, JobWorkerPorts};
pub use self::notifications_service::NotificationsService;
pub use self::page::{PageKey, PageQuery, page_query, paginate};
pub use self::professional::{Professional, ProfessionalDraft, ProfessionalValidationError};
pub use self::rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
pub use self::report::{
    BATCH_MAX, DocumentFlowStats, Notification, NotificationStatus, PROTOCOL_MAX,
    REPORT_TITLE_MAX, Report, ReportDraft, ReportStatus, ReportValidationError,
};
pub use self::reports_service::{ReportsPorts, ReportsService};
pub use self::share_link::{
    CreatedShareLink, SHARE_FILES_MAX, SHARE_HOURS_MAX, SHARE_HOURS_MIN, ShareLink,
    ShareLinkDraft, ShareLinkValidationError, ShareToken, SharedBundle,
};
pub use self::share_links_service::ShareLinksService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{
    DISPLAY_NAME_MAX, DISPLAY_NAME_MIN, DisplayName, Email, PASSWORD_MIN, Password,
    PasswordDigest, PasswordHashError, Registration, RegistrationError, Role, User,
    UserValidationError,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use portal::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("admins only"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
