//! Ownership Verification
//!
//! Proves a tenant controls a directory group: a short-lived code is issued,
//! the tenant places it in the group description, and a later check reads the
//! description back from the directory.

mod code;
pub mod data;
pub mod errors;
pub mod records;
mod repository;
pub mod service;

pub use errors::VerificationError;
pub use service::*;
