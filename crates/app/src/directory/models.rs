//! Directory Models

use serde::{Deserialize, Serialize};

use crate::domain::identifiers::{Rank, RoleId};

/// A role in a group's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRole {
    pub id: RoleId,
    pub name: String,
    pub rank: Rank,
}

/// Whether a read may be answered from the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve from cache while the entry is fresh.
    Cached,

    /// Always ask the directory, then refresh the cache.
    Live,
}

/// Find the catalog role carrying `rank`.
#[must_use]
pub fn resolve_rank(roles: &[DirectoryRole], rank: Rank) -> Option<&DirectoryRole> {
    roles.iter().find(|role| role.rank == rank)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RolesResponse {
    pub roles: Vec<DirectoryRole>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupResponse {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SetRoleRequest {
    pub role_id: RoleId,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetDescriptionRequest<'a> {
    pub description: &'a str,
}
