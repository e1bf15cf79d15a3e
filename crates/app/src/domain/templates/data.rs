//! Template Data

use crate::domain::{identifiers::Rank, templates::records::TemplateUuid};

/// New Template Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    pub uuid: TemplateUuid,
    pub name: String,
    pub description: String,
    pub questions: Vec<String>,
    pub approval_rank: Option<Rank>,
    pub cooldown_minutes: u32,
}
