//! Templates service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        identifiers::TenantId,
        templates::{
            data::NewTemplate,
            errors::TemplatesServiceError,
            records::{DecisionTemplate, TemplateUuid},
            repository::PgTemplatesRepository,
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgTemplatesService {
    db: Db,
    repository: PgTemplatesRepository,
}

impl PgTemplatesService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgTemplatesRepository::new(),
        }
    }
}

#[async_trait]
impl TemplatesService for PgTemplatesService {
    async fn create_template(
        &self,
        tenant: &TenantId,
        template: NewTemplate,
    ) -> Result<DecisionTemplate, TemplatesServiceError> {
        if template.name.trim().is_empty()
            || template.questions.iter().any(|q| q.trim().is_empty())
        {
            return Err(TemplatesServiceError::InvalidData);
        }

        let cooldown_minutes = i32::try_from(template.cooldown_minutes)?;

        let mut tx = self.db.begin().await?;

        let created = self
            .repository
            .create_template(&mut tx, tenant, &template, cooldown_minutes)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_template(
        &self,
        tenant: &TenantId,
        template: TemplateUuid,
    ) -> Result<DecisionTemplate, TemplatesServiceError> {
        let mut tx = self.db.begin().await?;

        let template = self.repository.get_template(&mut tx, tenant, template).await?;

        tx.commit().await?;

        Ok(template)
    }

    async fn list_templates(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<DecisionTemplate>, TemplatesServiceError> {
        let mut tx = self.db.begin().await?;

        let templates = self.repository.list_templates(&mut tx, tenant).await?;

        tx.commit().await?;

        Ok(templates)
    }

    async fn list_enabled_templates(
        &self,
        tenant: &TenantId,
        enabled: Vec<TemplateUuid>,
    ) -> Result<Vec<DecisionTemplate>, TemplatesServiceError> {
        if enabled.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.db.begin().await?;

        let templates = self
            .repository
            .list_enabled_templates(&mut tx, tenant, &enabled)
            .await?;

        tx.commit().await?;

        Ok(templates)
    }

    async fn set_active(
        &self,
        tenant: &TenantId,
        template: TemplateUuid,
        active: bool,
    ) -> Result<DecisionTemplate, TemplatesServiceError> {
        let mut tx = self.db.begin().await?;

        let template = self
            .repository
            .set_active(&mut tx, tenant, template, active)
            .await?;

        tx.commit().await?;

        Ok(template)
    }
}

#[automock]
#[async_trait]
pub trait TemplatesService: Send + Sync {
    /// Create a template owned by the tenant.
    async fn create_template(
        &self,
        tenant: &TenantId,
        template: NewTemplate,
    ) -> Result<DecisionTemplate, TemplatesServiceError>;

    /// Retrieve a single template.
    async fn get_template(
        &self,
        tenant: &TenantId,
        template: TemplateUuid,
    ) -> Result<DecisionTemplate, TemplatesServiceError>;

    /// All templates of the tenant, active or not.
    async fn list_templates(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<DecisionTemplate>, TemplatesServiceError>;

    /// Active templates whose ids are in `enabled`.
    async fn list_enabled_templates(
        &self,
        tenant: &TenantId,
        enabled: Vec<TemplateUuid>,
    ) -> Result<Vec<DecisionTemplate>, TemplatesServiceError>;

    /// Toggle whether the template accepts submissions.
    async fn set_active(
        &self,
        tenant: &TenantId,
        template: TemplateUuid,
        active: bool,
    ) -> Result<DecisionTemplate, TemplatesServiceError>;
}
