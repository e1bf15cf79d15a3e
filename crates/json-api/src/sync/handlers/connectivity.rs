//! Directory Connectivity Handler

use std::sync::Arc;

use ranksync_app::directory::Freshness;
use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
    sync::errors::directory_error,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ConnectivityResponse {
    #[serde(flatten)]
    pub status: Success,

    pub group_id: u64,

    /// Roles returned by a live catalog read
    pub role_count: usize,
}

/// Directory Connectivity Handler
///
/// Reads the group's role catalog live, bypassing the cache.
#[endpoint(
    tags("sync"),
    summary = "Test Directory Connection",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<ConnectivityResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let context = depot.authorized_or_401()?;
    let group = context.link.group_id;

    let roles = state
        .app
        .directory
        .list_roles(group, Freshness::Live)
        .await
        .map_err(|error| directory_error(&error))?;

    info!(
        tenant = %context.tenant_id(),
        group = %group,
        roles = roles.len(),
        "directory connection verified"
    );

    Ok(Json(ConnectivityResponse {
        status: Success::ok(),
        group_id: group.0,
        role_count: roles.len(),
    }))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::{
        sync::models::fixtures::role,
        test_helpers::{Mocks, authorized, link, service},
    };

    use super::*;

    #[tokio::test]
    async fn reads_the_catalog_live() -> TestResult {
        let mut mocks = Mocks::default();
        mocks
            .directory
            .expect_list_roles()
            .once()
            .withf(|_, freshness| *freshness == Freshness::Live)
            .return_once(|_, _| Ok(vec![role(10, 1), role(20, 5), role(30, 9)]));

        let response: ConnectivityResponse = TestClient::post("http://example.com/sync/test")
            .send(&service(
                mocks,
                authorized(link(), None),
                Router::with_path("sync/test").post(handler),
            ))
            .await
            .take_json()
            .await?;

        assert_eq!(response.role_count, 3);
        assert_eq!(response.status, Success::ok());

        Ok(())
    }
}
