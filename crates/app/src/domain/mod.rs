//! Rank Synchronization Domain Concerns

pub mod identifiers;
pub mod links;
pub mod submissions;
pub mod sync;
pub mod templates;
pub mod verification;
