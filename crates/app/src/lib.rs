//! Rank synchronization services: tenant links and credentials, ownership
//! verification, the sync queue and its worker, the decision source and the
//! secure ingress gateway.

pub mod context;
pub mod credentials;
pub mod database;
pub mod directory;
pub mod domain;
pub mod ingress;
pub mod worker;

#[cfg(test)]
mod test;

mod uuids;
