//! Submissions
//!
//! Subjects answer a decision template; a reviewer then approves or denies
//! the submission. Approvals of templates that carry a rank request that rank
//! through the sync queue.

pub mod data;
pub mod errors;
pub mod records;
mod repository;
pub mod service;

pub use errors::SubmissionsServiceError;
pub use service::*;
