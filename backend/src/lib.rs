//! Medical-document portal backend library.
//!
//! Hexagonal layout: [`domain`] holds entities, services and ports,
//! [`inbound`] adapts HTTP onto the driving ports, and [`outbound`]
//! implements the driven ports over PostgreSQL, Redis, and file storage.
//! [`wiring`] assembles the services over a chosen set of adapters.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod wiring;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
