//! Links service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::{
        identifiers::{ResourceId, TenantId},
        links::{
            data::{NewLink, SyncOutcome},
            errors::LinksServiceError,
            records::{LinkRecord, LinkTunables},
            repository::PgLinksRepository,
        },
        templates::records::TemplateUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgLinksService {
    db: Db,
    repository: PgLinksRepository,
}

impl PgLinksService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgLinksRepository::new(),
        }
    }
}

#[async_trait]
impl LinksService for PgLinksService {
    async fn create_link(&self, link: NewLink) -> Result<LinkRecord, LinksServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_link(&mut tx, &link).await?;

        tx.commit().await?;

        info!(tenant = %created.tenant_id, group = %created.group_id, "link created");

        Ok(created)
    }

    async fn get_link(&self, tenant: &TenantId) -> Result<LinkRecord, LinksServiceError> {
        let mut tx = self.db.begin().await?;

        let link = self.repository.get_link(&mut tx, tenant).await?;

        tx.commit().await?;

        Ok(link)
    }

    async fn set_resources(
        &self,
        tenant: &TenantId,
        resources: Vec<ResourceId>,
    ) -> Result<LinkRecord, LinksServiceError> {
        let mut tx = self.db.begin().await?;

        let mut resources = resources;
        resources.sort_unstable();
        resources.dedup();

        let link = self
            .repository
            .set_resources(&mut tx, tenant, &resources)
            .await?;

        tx.commit().await?;

        Ok(link)
    }

    async fn set_enabled_templates(
        &self,
        tenant: &TenantId,
        templates: Vec<TemplateUuid>,
    ) -> Result<LinkRecord, LinksServiceError> {
        let mut tx = self.db.begin().await?;

        let mut templates = templates;
        templates.sort_unstable();
        templates.dedup();

        let link = self
            .repository
            .set_enabled_templates(&mut tx, tenant, &templates)
            .await?;

        tx.commit().await?;

        Ok(link)
    }

    async fn update_tunables(
        &self,
        tenant: &TenantId,
        tunables: LinkTunables,
    ) -> Result<LinkRecord, LinksServiceError> {
        if tunables.rate_limit_window_seconds == 0 || tunables.rate_limit_max_requests == 0 {
            return Err(LinksServiceError::InvalidData);
        }

        let mut tx = self.db.begin().await?;

        let link = self
            .repository
            .update_tunables(&mut tx, tenant, tunables)
            .await?;

        tx.commit().await?;

        Ok(link)
    }

    async fn record_sync_outcome(
        &self,
        tenant: &TenantId,
        outcome: SyncOutcome,
        at: Timestamp,
    ) -> Result<(), LinksServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = match outcome {
            SyncOutcome::Succeeded => {
                self.repository
                    .record_sync_success(&mut tx, tenant, at)
                    .await?
            }
            SyncOutcome::Failed => self.repository.record_sync_failure(&mut tx, tenant).await?,
        };

        if rows_affected == 0 {
            return Err(LinksServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn disable_link(&self, tenant: &TenantId) -> Result<(), LinksServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.delete_link(&mut tx, tenant).await?;

        if rows_affected == 0 {
            return Err(LinksServiceError::NotFound);
        }

        tx.commit().await?;

        info!(tenant = %tenant, "link disabled");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait LinksService: Send + Sync {
    /// Onboard a tenant. Fails with `AlreadyExists` when the tenant is linked.
    async fn create_link(&self, link: NewLink) -> Result<LinkRecord, LinksServiceError>;

    /// Retrieve the link of a tenant.
    async fn get_link(&self, tenant: &TenantId) -> Result<LinkRecord, LinksServiceError>;

    /// Replace the resources the tenant credential is scoped to.
    async fn set_resources(
        &self,
        tenant: &TenantId,
        resources: Vec<ResourceId>,
    ) -> Result<LinkRecord, LinksServiceError>;

    /// Replace the set of templates allowed to trigger synchronization.
    async fn set_enabled_templates(
        &self,
        tenant: &TenantId,
        templates: Vec<TemplateUuid>,
    ) -> Result<LinkRecord, LinksServiceError>;

    /// Update rate limiting and auto-sync settings.
    async fn update_tunables(
        &self,
        tenant: &TenantId,
        tunables: LinkTunables,
    ) -> Result<LinkRecord, LinksServiceError>;

    /// Bump the cumulative sync counters.
    async fn record_sync_outcome(
        &self,
        tenant: &TenantId,
        outcome: SyncOutcome,
        at: Timestamp,
    ) -> Result<(), LinksServiceError>;

    /// Remove the link along with any pending verification challenge.
    async fn disable_link(&self, tenant: &TenantId) -> Result<(), LinksServiceError>;
}
