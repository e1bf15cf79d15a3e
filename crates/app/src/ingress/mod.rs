//! Secure Ingress
//!
//! Authorization of inbound integration requests: credential lookup, replay
//! window, request signatures and resource scope, followed by per-key rate
//! limiting.

mod gateway;
mod limiter;
mod rejection;
mod signature;

pub use gateway::*;
pub use limiter::*;
pub use rejection::*;
pub use signature::*;
