//! Group Ranks Handler

use std::sync::Arc;

use ranksync_app::directory::Freshness;
use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    sync::{errors::directory_error, models::RoleResponse},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RanksResponse {
    #[serde(flatten)]
    pub status: Success,

    pub group_id: u64,

    /// Role catalog of the group, possibly served from cache
    pub roles: Vec<RoleResponse>,
}

/// Group Ranks Handler
///
/// Lists the role catalog of the tenant's group.
#[endpoint(
    tags("sync"),
    summary = "Group Ranks",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<RanksResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let group = depot.authorized_or_401()?.link.group_id;

    let roles = state
        .app
        .directory
        .list_roles(group, Freshness::Cached)
        .await
        .map_err(|error| directory_error(&error))?;

    Ok(Json(RanksResponse {
        status: Success::ok(),
        group_id: group.0,
        roles: roles.into_iter().map(Into::into).collect(),
    }))
}
