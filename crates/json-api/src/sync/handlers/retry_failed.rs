//! Retry Failed Handler

use std::sync::Arc;

use jiff::Timestamp;
use ranksync_app::domain::identifiers::SubjectId;
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    sync::errors::queue_error,
};

/// Retry Failed Request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct RetryFailedRequest {
    /// Only retry this subject; all subjects when omitted
    #[serde(default)]
    pub subject_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RetryFailedResponse {
    #[serde(flatten)]
    pub status: Success,

    /// Jobs put back in the queue
    pub requeued: u64,
}

/// Retry Failed Handler
///
/// Re-queues the latest failed job of each subject with a fresh attempt budget.
#[endpoint(
    tags("sync"),
    summary = "Retry Failed Jobs",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    json: JsonBody<RetryFailedRequest>,
    depot: &mut Depot,
) -> Result<Json<RetryFailedResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.authorized_or_401()?.tenant_id();
    let subject = json.into_inner().subject_id.map(SubjectId);

    let requeued = state
        .app
        .queue
        .requeue_failed(tenant, subject, Timestamp::now())
        .await
        .map_err(queue_error)?;

    info!(tenant = %tenant, subject = ?subject, requeued, "failed jobs requeued");

    Ok(Json(RetryFailedResponse {
        status: Success::ok(),
        requeued,
    }))
}
