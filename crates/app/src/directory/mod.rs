//! Directory Service
//!
//! Client for the external identity system that owns groups, their role
//! catalog and each member's role.

mod bucket;
mod cache;
pub mod client;
pub mod errors;
pub mod models;
pub mod service;

pub use client::{DirectoryConfig, HttpDirectoryClient};
pub use errors::DirectoryError;
pub use models::{DirectoryRole, Freshness};
pub use service::*;
