//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on driving ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    Accounts, Administration, Files, HealthEvents, Notifications, Professionals, Reports,
    ShareLinks,
};

/// Default cap on uploaded file size: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Parameter object bundling every driving port.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub accounts: Arc<dyn Accounts>,
    pub admin: Arc<dyn Administration>,
    pub files: Arc<dyn Files>,
    pub reports: Arc<dyn Reports>,
    pub notifications: Arc<dyn Notifications>,
    pub events: Arc<dyn HealthEvents>,
    pub professionals: Arc<dyn Professionals>,
    pub share_links: Arc<dyn ShareLinks>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn Accounts>,
    pub admin: Arc<dyn Administration>,
    pub files: Arc<dyn Files>,
    pub reports: Arc<dyn Reports>,
    pub notifications: Arc<dyn Notifications>,
    pub events: Arc<dyn HealthEvents>,
    pub professionals: Arc<dyn Professionals>,
    pub share_links: Arc<dyn ShareLinks>,
    /// Largest accepted upload body.
    pub max_upload_bytes: usize,
}

impl HttpState {
    /// Construct state with the default upload cap.
    pub fn new(ports: HttpStatePorts) -> Self {
        Self::with_upload_limit(ports, DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Construct state with an explicit upload cap.
    pub fn with_upload_limit(ports: HttpStatePorts, max_upload_bytes: usize) -> Self {
        let HttpStatePorts {
            accounts,
            admin,
            files,
            reports,
            notifications,
            events,
            professionals,
            share_links,
        } = ports;
        Self {
            accounts,
            admin,
            files,
            reports,
            notifications,
            events,
            professionals,
            share_links,
            max_upload_bytes,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_ports {
    //! Mock-backed port bundles for handler tests.

    use super::*;
    use crate::domain::ports::{
        MockAccounts, MockAdministration, MockFiles, MockHealthEvents, MockNotifications,
        MockProfessionals, MockReports, MockShareLinks,
    };

    /// Mocks with no expectations; handlers under test replace the ones
    /// they call.
    pub(crate) struct MockPorts {
        pub accounts: MockAccounts,
        pub admin: MockAdministration,
        pub files: MockFiles,
        pub reports: MockReports,
        pub notifications: MockNotifications,
        pub events: MockHealthEvents,
        pub professionals: MockProfessionals,
        pub share_links: MockShareLinks,
    }

    impl Default for MockPorts {
        fn default() -> Self {
            Self {
                accounts: MockAccounts::new(),
                admin: MockAdministration::new(),
                files: MockFiles::new(),
                reports: MockReports::new(),
                notifications: MockNotifications::new(),
                events: MockHealthEvents::new(),
                professionals: MockProfessionals::new(),
                share_links: MockShareLinks::new(),
            }
        }
    }

    impl MockPorts {
        pub(crate) fn into_state(self) -> HttpState {
            HttpState::new(HttpStatePorts {
                accounts: Arc::new(self.accounts),
                admin: Arc::new(self.admin),
                files: Arc::new(self.files),
                reports: Arc::new(self.reports),
                notifications: Arc::new(self.notifications),
                events: Arc::new(self.events),
                professionals: Arc::new(self.professionals),
                share_links: Arc::new(self.share_links),
            })
        }
    }
}
