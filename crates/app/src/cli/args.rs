//! Argument groups shared by several commands.

use std::{sync::Arc, time::Duration};

use clap::Args;
use ranksync_app::{
    database::{self, Db},
    directory::{DirectoryConfig, DirectoryService, HttpDirectoryClient},
    domain::{identifiers::TenantId, sync::backoff::RetryPolicy},
};

#[derive(Debug, Args)]
pub(crate) struct DatabaseArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

impl DatabaseArgs {
    pub(crate) async fn connect(&self) -> Result<Db, String> {
        let pool = database::connect(&self.database_url)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;

        database::migrate(&pool)
            .await
            .map_err(|error| format!("failed to apply migrations: {error}"))?;

        Ok(Db::new(pool))
    }
}

#[derive(Debug, Args)]
pub(crate) struct TenantArgs {
    /// Tenant id
    #[arg(long)]
    tenant: String,
}

impl TenantArgs {
    pub(crate) fn tenant(&self) -> TenantId {
        TenantId::from(self.tenant.as_str())
    }
}

#[derive(Debug, Args)]
pub(crate) struct DirectoryArgs {
    /// Directory API base URL
    #[arg(long, env = "DIRECTORY_BASE_URL")]
    directory_base_url: String,

    /// Directory API key
    #[arg(long, env = "DIRECTORY_API_KEY", hide_env_values = true)]
    directory_api_key: String,

    /// Per-request timeout
    #[arg(long, env = "DIRECTORY_TIMEOUT_SECONDS", default_value_t = 10)]
    directory_timeout_seconds: u64,

    /// Calls per minute and endpoint
    #[arg(long, env = "DIRECTORY_CALLS_PER_MINUTE", default_value_t = 60)]
    directory_calls_per_minute: u32,
}

impl DirectoryArgs {
    pub(crate) fn client(&self) -> Result<Arc<dyn DirectoryService>, String> {
        let client = HttpDirectoryClient::new(DirectoryConfig {
            base_url: self.directory_base_url.clone(),
            api_key: self.directory_api_key.clone(),
            timeout: Duration::from_secs(self.directory_timeout_seconds),
            calls_per_minute: self.directory_calls_per_minute,
        })
        .map_err(|error| format!("failed to build directory client: {error}"))?;

        Ok(Arc::new(client))
    }
}

#[derive(Debug, Args)]
pub(crate) struct RetryArgs {
    /// Attempts before a job fails permanently
    #[arg(long, env = "SYNC_MAX_ATTEMPTS", default_value_t = 5)]
    max_attempts: u32,

    /// First retry delay
    #[arg(long, env = "SYNC_BACKOFF_BASE_MINUTES", default_value_t = 5)]
    backoff_base_minutes: u32,

    /// Longest retry delay
    #[arg(long, env = "SYNC_BACKOFF_CAP_MINUTES", default_value_t = 30)]
    backoff_cap_minutes: u32,

    /// Minutes a claimed job may run before it is taken back
    #[arg(long, env = "SYNC_CLAIM_LEASE_MINUTES", default_value_t = 10)]
    claim_lease_minutes: u32,
}

impl RetryArgs {
    pub(crate) fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_minutes: self.backoff_base_minutes,
            cap_minutes: self.backoff_cap_minutes,
            lease_minutes: self.claim_lease_minutes,
        }
    }
}
