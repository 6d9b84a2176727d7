//! Inbound adapters that translate external requests into domain service
//! calls while keeping framework details at the edge.
//!
//! HTTP handlers live under [`http`]; the job worker is driven from the
//! server binary rather than an inbound transport.

pub mod http;
