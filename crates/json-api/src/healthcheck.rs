//! Healthcheck Handler
//!
//! Unauthenticated liveness probe. Integrations also use `server_time` to
//! check clock drift before signing requests.

use jiff::Timestamp;
use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

/// Healthcheck response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct HealthResponse {
    /// Always `ok` while the process serves requests
    pub status: String,

    /// Server build version
    pub version: String,

    /// Server clock, seconds since the Unix epoch
    pub server_time: i64,
}

#[endpoint(tags("health"), summary = "Health check endpoint")]
pub(crate) async fn handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        server_time: Timestamp::now().as_second(),
    })
}

#[cfg(test)]
mod tests {
    use salvo::{
        prelude::*,
        test::{ResponseExt, TestClient},
    };
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn reports_status_and_server_clock() -> TestResult {
        let before = Timestamp::now().as_second();
        let router = Router::new().push(Router::with_path("healthcheck").get(handler));

        let response: HealthResponse = TestClient::get("http://example.com/healthcheck")
            .send(&Service::new(router))
            .await
            .take_json()
            .await?;

        assert_eq!(response.status, "ok");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
        assert!(
            response.server_time >= before,
            "server time should not lag the test clock"
        );

        Ok(())
    }
}
