//! Manual Sync Handler

use std::sync::Arc;

use jiff::Timestamp;
use ranksync_app::domain::{
    identifiers::{Rank, SubjectId},
    sync::{data::NewSyncJob, records::JobOrigin},
};
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
    sync::{errors::queue_error, models::JobResponse},
};

const DEFAULT_PRIORITY: i32 = 10;

/// Manual Sync Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ManualSyncRequest {
    pub subject_id: u64,
    pub target_rank: u8,

    /// Higher runs first; defaults to 10
    #[serde(default)]
    pub priority: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ManualSyncResponse {
    #[serde(flatten)]
    pub status: Success,

    pub job: JobResponse,
}

/// Manual Sync Handler
///
/// Queues a rank change for a subject.
#[endpoint(
    tags("sync"),
    summary = "Queue Manual Sync",
    security(("bearer_auth" = [])),
    responses(
        (status_code = 201, description = "Sync job queued"),
        (status_code = 409, description = "A job is already pending for the subject"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<ManualSyncRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<ManualSyncResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let context = depot.authorized_or_401()?;
    let request = json.into_inner();

    let reference = context
        .resource
        .map_or_else(|| "api".to_owned(), |resource| format!("resource:{resource}"));

    let job = state
        .app
        .queue
        .enqueue(
            NewSyncJob {
                tenant_id: context.tenant_id().clone(),
                subject_id: SubjectId(request.subject_id),
                target_rank: Rank(request.target_rank),
                priority: request.priority.unwrap_or(DEFAULT_PRIORITY),
                origin: JobOrigin::manual(reference),
            },
            Timestamp::now(),
        )
        .await
        .map_err(queue_error)?;

    info!(
        tenant = %context.tenant_id(),
        job = %job.uuid,
        subject = %job.subject_id,
        target_rank = %job.target_rank,
        "manual sync queued"
    );

    res.status_code(StatusCode::CREATED);

    Ok(Json(ManualSyncResponse {
        status: Success::ok(),
        job: job.into(),
    }))
}
