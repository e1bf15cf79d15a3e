//! Link Data

use crate::domain::{
    identifiers::{GroupId, ResourceId, TenantId},
    links::records::LinkTunables,
};

/// New Link Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub tenant_id: TenantId,
    pub group_id: GroupId,
    pub resource_ids: Vec<ResourceId>,
    pub tunables: LinkTunables,
}

/// Outcome of a single synchronization attempt, as recorded on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Succeeded,
    Failed,
}
