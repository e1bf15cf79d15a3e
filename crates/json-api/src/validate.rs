//! Handshake Handler

use jiff::Timestamp;
use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
};

/// Validate Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ValidateResponse {
    #[serde(flatten)]
    pub status: Success,

    /// Tenant the credential belongs to
    pub tenant_id: String,

    /// Directory group managed by the tenant
    pub group_id: u64,

    /// Resources the credential is scoped to
    pub resource_ids: Vec<u64>,

    /// Templates allowed to trigger synchronization
    pub enabled_templates: Vec<Uuid>,

    /// Whether approvals enqueue rank changes
    pub auto_sync: bool,

    /// Server clock, for drift diagnostics
    pub server_time: String,
}

/// Validate Handler
///
/// Confirms the credential, signature and resource scope of the caller.
#[endpoint(
    tags("ingress"),
    summary = "Validate Credential",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<ValidateResponse>, ApiError> {
    let context = depot.authorized_or_401()?;

    if context.resource.is_none() {
        return Err(ApiError::missing_param("resource_id"));
    }

    let link = &context.link;

    Ok(Json(ValidateResponse {
        status: Success::ok(),
        tenant_id: link.tenant_id.to_string(),
        group_id: link.group_id.0,
        resource_ids: link.resource_ids.iter().map(|resource| resource.0).collect(),
        enabled_templates: link
            .enabled_templates
            .iter()
            .map(|template| template.into_uuid())
            .collect(),
        auto_sync: link.tunables.auto_sync,
        server_time: Timestamp::now().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use ranksync_app::domain::templates::records::TemplateUuid;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::Value;
    use testresult::TestResult;

    use crate::test_helpers::{Mocks, authorized, link, service};

    use super::*;

    #[tokio::test]
    async fn returns_the_link_summary() -> TestResult {
        let template = TemplateUuid::new();
        let mut link = link();
        link.enabled_templates = vec![template];

        let response: ValidateResponse = TestClient::post("http://example.com/validate")
            .send(&service(
                Mocks::default(),
                authorized(link, Some(1)),
                Router::with_path("validate").post(handler),
            ))
            .await
            .take_json()
            .await?;

        assert_eq!(response.status, Success::ok());
        assert_eq!(response.tenant_id, "guild-1");
        assert_eq!(response.group_id, 77);
        assert_eq!(response.resource_ids, vec![1, 2]);
        assert_eq!(response.enabled_templates, vec![template.into_uuid()]);
        assert!(response.auto_sync, "auto sync defaults to on");

        Ok(())
    }

    #[tokio::test]
    async fn requires_a_resource() -> TestResult {
        let mut res = TestClient::post("http://example.com/validate")
            .send(&service(
                Mocks::default(),
                authorized(link(), None),
                Router::with_path("validate").post(handler),
            ))
            .await;

        let body: Value = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        assert_eq!(body.get("code").and_then(Value::as_str), Some("MISSING_PARAMS"));

        Ok(())
    }
}
