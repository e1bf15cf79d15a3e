//! Template Models

use ranksync_app::domain::templates::records::DecisionTemplate;
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Template Response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub(crate) struct TemplateResponse {
    /// The unique identifier of the template
    pub id: Uuid,

    pub name: String,
    pub description: String,

    /// Questions every submission must answer
    pub questions: Vec<String>,

    /// Rank granted when a submission is approved
    pub approval_rank: Option<u8>,

    /// Minutes a subject waits between submissions
    pub cooldown_minutes: u32,
}

impl From<DecisionTemplate> for TemplateResponse {
    fn from(template: DecisionTemplate) -> Self {
        Self {
            id: template.uuid.into_uuid(),
            name: template.name,
            description: template.description,
            questions: template.questions,
            approval_rank: template.approval_rank.map(|rank| rank.0),
            cooldown_minutes: template.cooldown_minutes,
        }
    }
}
