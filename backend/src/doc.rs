//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects every `/api/v1` handler and the health checks, the
//! response DTOs from [`crate::inbound::http::schemas`], the request bodies,
//! and the session cookie security scheme. Swagger UI serves it in debug
//! builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{DocumentFlowStats, Error, ErrorCode, JobStatus};
use crate::inbound::http::admin::UpdateUserRequest;
use crate::inbound::http::auth::{LoginRequest, RegisterRequest};
use crate::inbound::http::events::{CreateEventRequest, EventRequest};
use crate::inbound::http::professionals::ProfessionalRequest;
use crate::inbound::http::reports::{BatchReportRequest, SendReportRequest};
use crate::inbound::http::schemas::{
    AuditPage, AuditRecordResponse, CreatedShareLinkResponse, EventResponse, FilePage,
    FileResponse, NotificationPage, NotificationResponse, ProfessionalResponse, ReportPage,
    ReportResponse, ShareLinkResponse, SharedBundleResponse, SharedFileResponse, UserPage,
    UserResponse,
};
use crate::inbound::http::session_config::SESSION_COOKIE_NAME;
use crate::inbound::http::share_links::CreateShareLinkRequest;

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                SESSION_COOKIE_NAME,
                "Private session cookie issued by POST /api/v1/auth/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Medical document portal API",
        description = "Report delivery between laboratories and patients, health calendars, \
                       share links and administration.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::register,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::users::current_user,
        crate::inbound::http::files::upload_file,
        crate::inbound::http::files::list_files,
        crate::inbound::http::files::download_file,
        crate::inbound::http::files::delete_file,
        crate::inbound::http::reports::send_report,
        crate::inbound::http::reports::send_batch,
        crate::inbound::http::reports::list_sent,
        crate::inbound::http::reports::list_received,
        crate::inbound::http::reports::get_report,
        crate::inbound::http::reports::job_status,
        crate::inbound::http::notifications::list_notifications,
        crate::inbound::http::notifications::archive_notification,
        crate::inbound::http::events::create_event,
        crate::inbound::http::events::list_events,
        crate::inbound::http::events::get_event,
        crate::inbound::http::events::update_event,
        crate::inbound::http::events::delete_event,
        crate::inbound::http::professionals::create_professional,
        crate::inbound::http::professionals::list_professionals,
        crate::inbound::http::professionals::delete_professional,
        crate::inbound::http::share_links::create_share_link,
        crate::inbound::http::share_links::list_share_links,
        crate::inbound::http::share_links::revoke_share_link,
        crate::inbound::http::share_links::resolve_shared,
        crate::inbound::http::share_links::download_shared,
        crate::inbound::http::admin::list_users,
        crate::inbound::http::admin::update_user,
        crate::inbound::http::admin::audit_log,
        crate::inbound::http::admin::stats,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        UserResponse,
        UserPage,
        FileResponse,
        FilePage,
        ReportResponse,
        ReportPage,
        NotificationResponse,
        NotificationPage,
        EventResponse,
        ProfessionalResponse,
        ShareLinkResponse,
        CreatedShareLinkResponse,
        SharedBundleResponse,
        SharedFileResponse,
        AuditRecordResponse,
        AuditPage,
        JobStatus,
        DocumentFlowStats,
        RegisterRequest,
        LoginRequest,
        SendReportRequest,
        BatchReportRequest,
        EventRequest,
        CreateEventRequest,
        ProfessionalRequest,
        CreateShareLinkRequest,
        UpdateUserRequest,
    )),
    tags(
        (name = "auth", description = "Registration and session lifecycle"),
        (name = "users", description = "The signed-in account"),
        (name = "files", description = "Uploaded documents"),
        (name = "reports", description = "Reports sent from emissors to receptors"),
        (name = "jobs", description = "Background batch progress"),
        (name = "notifications", description = "Receptor inbox"),
        (name = "events", description = "Health event calendar"),
        (name = "professionals", description = "Receptor contact list"),
        (name = "share-links", description = "Expiring links to selected files"),
        (name = "shared", description = "Public share-link redemption"),
        (name = "admin", description = "Administration and audit"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
