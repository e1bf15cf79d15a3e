//! Role Sync Worker
//!
//! Polls the sync queue, reconciles each claimed job against the directory
//! and reports the outcome back to the queue and the tenant's counters.

mod failure;
mod report;
mod service;

pub use failure::SyncFailure;
pub use report::{TickReport, TickSummary};
pub use service::*;
