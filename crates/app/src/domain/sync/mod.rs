//! Sync Queue
//!
//! Durable reconciliation jobs: one requested rank for one subject of one
//! tenant, claimed by the worker and retried with capped exponential backoff.

pub mod backoff;
pub mod data;
pub mod errors;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::SyncQueueError;
pub use service::*;
