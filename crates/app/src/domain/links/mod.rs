//! Links
//!
//! A link is the onboarding record of a tenant: the directory group it
//! controls, the resources its credential may act on, its verification state
//! and its synchronization counters.

pub mod data;
pub mod errors;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::LinksServiceError;
pub use service::*;
