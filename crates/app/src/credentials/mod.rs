//! Tenant Credentials
//!
//! Each link carries at most one bearer credential. Only a salted digest of
//! the secret is stored; the plaintext token is shown once at issuance.

mod errors;
mod service;
mod token;

pub use errors::CredentialStoreError;
pub use service::*;
pub use token::*;
