//! Template Records

use jiff::Timestamp;
use serde::Serialize;

use crate::{
    domain::identifiers::{Rank, TenantId},
    uuids::TypedUuid,
};

/// Template UUID
pub type TemplateUuid = TypedUuid<DecisionTemplate>;

/// Decision Template Record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionTemplate {
    pub uuid: TemplateUuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub questions: Vec<String>,
    pub approval_rank: Option<Rank>,
    pub cooldown_minutes: u32,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
