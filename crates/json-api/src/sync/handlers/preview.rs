//! Sync Preview Handler

use std::sync::Arc;

use ranksync_app::{
    directory::{Freshness, models::resolve_rank},
    domain::identifiers::{Rank, SubjectId},
};
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    sync::{errors::directory_error, models::RoleResponse},
};

/// Sync Preview Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PreviewRequest {
    pub subject_id: u64,
    pub target_rank: u8,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PreviewResponse {
    #[serde(flatten)]
    pub status: Success,

    pub subject_id: u64,

    /// Role the subject holds now
    pub current_role: RoleResponse,

    /// Role the target rank resolves to, if the catalog has one
    pub target_role: Option<RoleResponse>,

    /// Whether a sync would change the subject's role
    pub would_change: bool,
}

/// Sync Preview Handler
///
/// Reports what a sync to `target_rank` would do, without queueing anything.
#[endpoint(
    tags("sync"),
    summary = "Preview Sync",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    json: JsonBody<PreviewRequest>,
    depot: &mut Depot,
) -> Result<Json<PreviewResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let group = depot.authorized_or_401()?.link.group_id;
    let request = json.into_inner();
    let subject = SubjectId(request.subject_id);

    let current = state
        .app
        .directory
        .get_user_role(group, subject)
        .await
        .map_err(|error| directory_error(&error))?;

    let roles = state
        .app
        .directory
        .list_roles(group, Freshness::Cached)
        .await
        .map_err(|error| directory_error(&error))?;

    let target = resolve_rank(&roles, Rank(request.target_rank)).cloned();
    let would_change = target.as_ref().is_some_and(|role| role.id != current.id);

    Ok(Json(PreviewResponse {
        status: Success::ok(),
        subject_id: subject.0,
        current_role: current.into(),
        target_role: target.map(Into::into),
        would_change,
    }))
}
