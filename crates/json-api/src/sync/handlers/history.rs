//! Sync History Handler

use std::sync::Arc;

use ranksync_app::domain::identifiers::SubjectId;
use salvo::{
    oapi::{
        ToSchema,
        extract::{PathParam, QueryParam},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    sync::{errors::queue_error, models::JobResponse},
};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct HistoryResponse {
    #[serde(flatten)]
    pub status: Success,

    pub subject_id: u64,

    /// Jobs of the subject, newest first
    pub jobs: Vec<JobResponse>,
}

/// Sync History Handler
///
/// Returns up to `limit` jobs of a subject, newest first.
#[endpoint(
    tags("sync"),
    summary = "Subject Sync History",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    identity: PathParam<u64>,
    limit: QueryParam<u32, false>,
    depot: &mut Depot,
) -> Result<Json<HistoryResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.authorized_or_401()?.tenant_id();
    let subject = SubjectId(identity.into_inner());

    let limit = limit
        .into_inner()
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);

    let jobs = state
        .app
        .queue
        .history_for(tenant, subject, limit)
        .await
        .map_err(queue_error)?;

    Ok(Json(HistoryResponse {
        status: Success::ok(),
        subject_id: subject.0,
        jobs: jobs.into_iter().map(Into::into).collect(),
    }))
}
