//! Rank Mappings Handler

use std::sync::Arc;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    envelope::{ApiError, Success},
    extensions::*,
    state::State,
};

/// Template to rank mapping
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct MappingResponse {
    pub template_id: Uuid,
    pub template_name: String,

    /// Rank requested when a submission of the template is approved
    pub approval_rank: u8,

    /// Whether approvals of the template trigger synchronization
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct MappingsResponse {
    #[serde(flatten)]
    pub status: Success,

    pub mappings: Vec<MappingResponse>,
}

/// Rank Mappings Handler
///
/// Lists the tenant's templates that grant a rank on approval.
#[endpoint(
    tags("sync"),
    summary = "Rank Mappings",
    security(("bearer_auth" = []))
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<MappingsResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let link = &depot.authorized_or_401()?.link;

    let templates = state
        .app
        .templates
        .list_templates(&link.tenant_id)
        .await
        .or_500("failed to list templates")?;

    let mappings = templates
        .into_iter()
        .filter_map(|template| {
            let enabled = template.active && link.template_enabled(template.uuid);

            Some(MappingResponse {
                template_id: template.uuid.into_uuid(),
                approval_rank: template.approval_rank?.0,
                template_name: template.name,
                enabled,
            })
        })
        .collect();

    Ok(Json(MappingsResponse {
        status: Success::ok(),
        mappings,
    }))
}
