//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain repository ports backed by
//! PostgreSQL via Diesel with async support through `diesel-async` and `bb8`
//! connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel models
//!   and domain types. Ownership rules live in the domain services.
//! - **Row-level security**: every call runs in its own transaction that
//!   first sets `app.user_id` and `app.role` from the caller's
//!   [`AccessContext`](crate::domain::AccessContext). Policies in the
//!   migrations read those settings.
//! - **Internal models**: row structs (`models.rs`) and the schema
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: database errors are mapped to the port's
//!   error enum without copying database messages.
//!
//! # Example
//!
//! ```ignore
//! use portal::outbound::persistence::{DbPool, PoolConfig, DieselUserRepository};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/portal")).await?;
//! let repo = DieselUserRepository::new(pool);
//! ```

mod diesel_audit_repository;
mod diesel_calendar_repository;
mod diesel_file_repository;
pub(crate) mod diesel_helpers;
mod diesel_report_repository;
mod diesel_share_link_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_audit_repository::DieselAuditRepository;
pub use diesel_calendar_repository::{DieselHealthEventRepository, DieselProfessionalRepository};
pub use diesel_file_repository::DieselFileRepository;
pub use diesel_report_repository::{DieselNotificationRepository, DieselReportRepository};
pub use diesel_share_link_repository::DieselShareLinkRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
