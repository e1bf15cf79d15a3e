//! Cancel Sync Handler

use std::sync::Arc;

use jiff::Timestamp;
use ranksync_app::domain::identifiers::SubjectId;
use salvo::{
    oapi::{ToSchema, extract::PathParam},
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

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CancelResponse {
    #[serde(flatten)]
    pub status: Success,

    pub subject_id: u64,

    /// Queued or retrying jobs that were cancelled
    pub cancelled: u64,
}

/// Cancel Sync Handler
///
/// Cancels the subject's queued and retrying jobs. A job already in progress
/// runs to completion.
#[endpoint(
    tags("sync"),
    summary = "Cancel Pending Sync",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    identity: PathParam<u64>,
    depot: &mut Depot,
) -> Result<Json<CancelResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.authorized_or_401()?.tenant_id();
    let subject = SubjectId(identity.into_inner());

    let cancelled = state
        .app
        .queue
        .cancel_pending_for(tenant, subject, Timestamp::now())
        .await
        .map_err(queue_error)?;

    info!(tenant = %tenant, subject = %subject, cancelled, "pending sync cancelled");

    Ok(Json(CancelResponse {
        status: Success::ok(),
        subject_id: subject.0,
        cancelled,
    }))
}
