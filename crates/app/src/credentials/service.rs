//! Credential store.

use std::fmt;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    credentials::{
        errors::CredentialStoreError,
        token::{
            CredentialVersion, format_token, generate_salt, generate_secret, hash_secret,
            parse_token, secret_matches,
        },
    },
    database::Db,
    domain::{
        identifiers::TenantId,
        links::{
            records::{LinkRecord, StoredCredential},
            repository::PgLinksRepository,
        },
    },
};

/// Issuance result carrying the one-time plaintext token.
#[derive(Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub key_id: Uuid,
    pub issued_at: Timestamp,
}

impl fmt::Debug for IssuedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCredential")
            .field("token", &"**redacted**")
            .field("key_id", &self.key_id)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    db: Db,
    links: PgLinksRepository,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            links: PgLinksRepository::new(),
        }
    }

    async fn write_credential(
        &self,
        tenant: &TenantId,
        now: Timestamp,
        replace: bool,
    ) -> Result<IssuedCredential, CredentialStoreError> {
        let mut tx = self.db.begin().await?;

        let link = self
            .links
            .lock_link(&mut tx, tenant)
            .await?
            .ok_or(CredentialStoreError::LinkNotFound)?;

        if link.credential.is_some() && !replace {
            return Err(CredentialStoreError::AlreadyIssued);
        }

        let key_id = Uuid::now_v7();
        let secret = generate_secret();
        let salt = generate_salt();

        let stored = StoredCredential {
            key_id,
            salt: hex::encode(salt),
            hash: hash_secret(&salt, &secret),
        };

        self.links
            .set_credential(&mut tx, tenant, &stored, now)
            .await?;

        tx.commit().await?;

        Ok(IssuedCredential {
            token: format_token(key_id, CredentialVersion::V1, &secret),
            key_id,
            issued_at: now,
        })
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn issue(
        &self,
        tenant: &TenantId,
        now: Timestamp,
    ) -> Result<IssuedCredential, CredentialStoreError> {
        let issued = self.write_credential(tenant, now, false).await?;

        info!(tenant = %tenant, key = %issued.key_id, "credential issued");

        Ok(issued)
    }

    async fn validate(&self, presented: &str) -> Result<Option<LinkRecord>, CredentialStoreError> {
        let Ok(parsed) = parse_token(presented) else {
            return Ok(None);
        };

        let mut tx = self.db.begin().await?;

        let lookup = self
            .links
            .find_by_credential_key(&mut tx, parsed.key_id)
            .await?;

        tx.commit().await?;

        let Some(lookup) = lookup else {
            debug!(key = %parsed.key_id, "credential key not found");
            return Ok(None);
        };

        if secret_matches(&lookup.stored.salt, &lookup.stored.hash, &parsed.secret) {
            Ok(Some(lookup.link))
        } else {
            Ok(None)
        }
    }

    async fn regenerate(
        &self,
        tenant: &TenantId,
        now: Timestamp,
    ) -> Result<IssuedCredential, CredentialStoreError> {
        let issued = self.write_credential(tenant, now, true).await?;

        info!(tenant = %tenant, key = %issued.key_id, "credential regenerated");

        Ok(issued)
    }

    async fn touch_last_used(
        &self,
        tenant: &TenantId,
        now: Timestamp,
    ) -> Result<(), CredentialStoreError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.links.touch_credential(&mut tx, tenant, now).await?;

        if rows_affected == 0 {
            return Err(CredentialStoreError::LinkNotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Issue the tenant's first credential. The plaintext is returned once.
    async fn issue(
        &self,
        tenant: &TenantId,
        now: Timestamp,
    ) -> Result<IssuedCredential, CredentialStoreError>;

    /// Resolve a presented token to its link, or `None` when it does not validate.
    async fn validate(&self, presented: &str) -> Result<Option<LinkRecord>, CredentialStoreError>;

    /// Replace the credential. The previous token stops validating immediately.
    async fn regenerate(
        &self,
        tenant: &TenantId,
        now: Timestamp,
    ) -> Result<IssuedCredential, CredentialStoreError>;

    async fn touch_last_used(
        &self,
        tenant: &TenantId,
        now: Timestamp,
    ) -> Result<(), CredentialStoreError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::links::LinksService,
        test::{TestContext, helpers::new_link},
    };

    use super::*;

    #[tokio::test]
    async fn issued_credential_validates_to_its_link() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = TenantId::from("guild-1");
        ctx.links.create_link(new_link("guild-1", 77, &[1])).await?;

        let issued = ctx.credentials.issue(&tenant, Timestamp::now()).await?;

        let link = ctx.credentials.validate(&issued.token).await?;

        assert_eq!(link.map(|link| link.tenant_id), Some(tenant.clone()));

        let stored = ctx.links.get_link(&tenant).await?;

        assert_eq!(stored.credential.map(|c| c.key_id), Some(issued.key_id));

        Ok(())
    }

    #[tokio::test]
    async fn issue_twice_requires_regenerate() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = TenantId::from("guild-1");
        ctx.links.create_link(new_link("guild-1", 77, &[1])).await?;

        ctx.credentials.issue(&tenant, Timestamp::now()).await?;

        assert!(matches!(
            ctx.credentials.issue(&tenant, Timestamp::now()).await,
            Err(CredentialStoreError::AlreadyIssued)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn regenerate_invalidates_previous_token() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = TenantId::from("guild-1");
        ctx.links.create_link(new_link("guild-1", 77, &[1])).await?;

        let old = ctx.credentials.issue(&tenant, Timestamp::now()).await?;
        let new = ctx.credentials.regenerate(&tenant, Timestamp::now()).await?;

        assert_ne!(old.token, new.token);
        assert!(ctx.credentials.validate(&old.token).await?.is_none());
        assert!(ctx.credentials.validate(&new.token).await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn tampered_or_malformed_tokens_do_not_validate() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = TenantId::from("guild-1");
        ctx.links.create_link(new_link("guild-1", 77, &[1])).await?;

        let issued = ctx.credentials.issue(&tenant, Timestamp::now()).await?;

        let (prefix, _) = issued.token.split_once('.').ok_or("token has no secret")?;
        let tampered = format!("{prefix}.{}", "00".repeat(32));

        assert!(ctx.credentials.validate(&tampered).await?.is_none());
        assert!(ctx.credentials.validate("garbage").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn credentials_for_unknown_tenants_are_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = TenantId::from("missing");

        assert!(matches!(
            ctx.credentials.issue(&tenant, Timestamp::now()).await,
            Err(CredentialStoreError::LinkNotFound)
        ));
        assert!(matches!(
            ctx.credentials.touch_last_used(&tenant, Timestamp::now()).await,
            Err(CredentialStoreError::LinkNotFound)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn touch_last_used_records_timestamp() -> TestResult {
        let ctx = TestContext::new().await;
        let tenant = TenantId::from("guild-1");
        ctx.links.create_link(new_link("guild-1", 77, &[1])).await?;
        ctx.credentials.issue(&tenant, Timestamp::now()).await?;

        ctx.credentials
            .touch_last_used(&tenant, Timestamp::now())
            .await?;

        let link = ctx.links.get_link(&tenant).await?;

        assert!(link.credential.and_then(|c| c.last_used_at).is_some());

        Ok(())
    }
}
