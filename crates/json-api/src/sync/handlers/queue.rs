//! Sync Queue Handler

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    sync::{
        errors::queue_error,
        models::{JobResponse, QueueStatsResponse},
    },
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct QueueResponse {
    #[serde(flatten)]
    pub status: Success,

    /// Jobs that are queued, retrying or in progress
    pub jobs: Vec<JobResponse>,

    pub stats: QueueStatsResponse,
}

/// Sync Queue Handler
///
/// Returns the tenant's unfinished jobs and job counts by status.
#[endpoint(
    tags("sync"),
    summary = "Sync Queue",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<QueueResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.authorized_or_401()?.tenant_id();

    let jobs = state
        .app
        .queue
        .list_active(tenant)
        .await
        .map_err(queue_error)?;

    let stats = state
        .app
        .queue
        .queue_stats(tenant)
        .await
        .map_err(queue_error)?;

    Ok(Json(QueueResponse {
        status: Success::ok(),
        jobs: jobs.into_iter().map(Into::into).collect(),
        stats: stats.into(),
    }))
}
