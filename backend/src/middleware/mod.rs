//! Request middleware.
//!
//! Purpose: cross-cutting request concerns that run before handlers:
//! correlation identifiers and per-client rate limiting.

pub mod client_ip;
pub mod rate_limit;
pub mod trace;

pub use client_ip::client_ip;
pub use rate_limit::RateLimit;
pub use trace::Trace;
