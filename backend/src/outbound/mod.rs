//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel with a per-call
//!   row-level-security context
//! - **cache**: Redis key-value store on a `bb8-redis` pool
//! - **queue**: Redis job queue and the job-status store
//! - **storage**: local filesystem and Cloudinary file storage
//! - **memory**: in-process stand-ins for development and tests
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cache;
pub mod memory;
pub mod persistence;
pub mod queue;
pub mod storage;
