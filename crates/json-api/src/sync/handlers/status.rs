//! Sync Status Handler

use std::sync::Arc;

use ranksync_app::domain::identifiers::SubjectId;
use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    sync::{errors::queue_error, models::JobResponse},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct SyncStatusResponse {
    #[serde(flatten)]
    pub status: Success,

    pub subject_id: u64,

    /// Queued, retrying or in-progress job, if any
    pub active_job: Option<JobResponse>,

    /// Most recently created job
    pub last_job: Option<JobResponse>,
}

/// Sync Status Handler
///
/// Returns the active and most recent sync jobs of a subject.
#[endpoint(
    tags("sync"),
    summary = "Subject Sync Status",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(
    identity: PathParam<u64>,
    depot: &mut Depot,
) -> Result<Json<SyncStatusResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let tenant = depot.authorized_or_401()?.tenant_id();
    let subject = SubjectId(identity.into_inner());

    let active_job = state
        .app
        .queue
        .active_job_for(tenant, subject)
        .await
        .map_err(queue_error)?;

    let last_job = state
        .app
        .queue
        .history_for(tenant, subject, 1)
        .await
        .map_err(queue_error)?
        .into_iter()
        .next();

    Ok(Json(SyncStatusResponse {
        status: Success::ok(),
        subject_id: subject.0,
        active_job: active_job.map(Into::into),
        last_job: last_job.map(Into::into),
    }))
}

#[cfg(test)]
mod tests {
    use ranksync_app::domain::sync::records::JobStatus;
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::{
        sync::models::fixtures::job,
        test_helpers::{Mocks, authorized, link, service},
    };

    use super::*;

    #[tokio::test]
    async fn reports_active_and_last_jobs() -> TestResult {
        let active = job(9, JobStatus::Retrying);
        let active_id = active.uuid.into_uuid();
        let latest = active.clone();

        let mut mocks = Mocks::default();
        mocks
            .queue
            .expect_active_job_for()
            .once()
            .withf(|_, subject| *subject == SubjectId(9))
            .return_once(move |_, _| Ok(Some(active)));
        mocks
            .queue
            .expect_history_for()
            .once()
            .withf(|_, subject, limit| *subject == SubjectId(9) && *limit == 1)
            .return_once(move |_, _, _| Ok(vec![latest]));

        let response: SyncStatusResponse = TestClient::get("http://example.com/sync/status/9")
            .send(&service(
                mocks,
                authorized(link(), None),
                Router::with_path("sync/status/{identity}").get(handler),
            ))
            .await
            .take_json()
            .await?;

        assert_eq!(response.subject_id, 9);
        assert_eq!(response.active_job.map(|job| job.id), Some(active_id));
        assert_eq!(
            response.last_job.map(|job| job.status),
            Some("retrying".to_owned())
        );

        Ok(())
    }

    #[tokio::test]
    async fn subjects_without_jobs_report_nothing() -> TestResult {
        let mut mocks = Mocks::default();
        mocks
            .queue
            .expect_active_job_for()
            .return_once(|_, _| Ok(None));
        mocks
            .queue
            .expect_history_for()
            .return_once(|_, _, _| Ok(Vec::new()));

        let response: SyncStatusResponse = TestClient::get("http://example.com/sync/status/9")
            .send(&service(
                mocks,
                authorized(link(), None),
                Router::with_path("sync/status/{identity}").get(handler),
            ))
            .await
            .take_json()
            .await?;

        assert!(response.active_job.is_none(), "no active job expected");
        assert!(response.last_job.is_none(), "no previous job expected");

        Ok(())
    }
}
