//! Server configuration module

use std::time::Duration;

use clap::Parser;
use jiff::SignedDuration;
use ranksync_app::{
    context::AppSettings,
    directory::DirectoryConfig,
    domain::{sync::backoff::RetryPolicy, verification::data::ChallengePolicy},
    ingress::{GatewayConfig, RateLimit},
    worker::WorkerConfig,
};

use crate::config::{
    db::DatabaseConfig,
    directory::DirectorySettings,
    gateway::GatewaySettings,
    observability::{LoggingConfig, ObservabilityConfig},
    server::ServerRuntimeConfig,
    worker::WorkerSettings,
};

pub(crate) mod db;
pub(crate) mod directory;
pub(crate) mod gateway;
pub(crate) mod observability;
pub(crate) mod server;
pub(crate) mod worker;

/// Ranksync JSON API Server configuration
#[derive(Debug, Parser)]
#[command(name = "ranksync-json", about = "Ranksync JSON API Server", long_about = None)]
pub struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Observability (traces/metrics) settings.
    #[command(flatten)]
    pub observability: ObservabilityConfig,

    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Directory service client settings.
    #[command(flatten)]
    pub directory: DirectorySettings,

    /// Ingress gateway settings.
    #[command(flatten)]
    pub gateway: GatewaySettings,

    /// Role sync worker settings.
    #[command(flatten)]
    pub worker: WorkerSettings,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }

    /// Settings handed to the application services.
    #[must_use]
    pub fn app_settings(&self) -> AppSettings {
        AppSettings {
            directory: DirectoryConfig {
                base_url: self.directory.directory_base_url.clone(),
                api_key: self.directory.directory_api_key.clone(),
                timeout: Duration::from_secs(self.directory.directory_timeout_seconds),
                calls_per_minute: self.directory.directory_calls_per_minute,
            },
            retry: RetryPolicy {
                max_attempts: self.worker.sync_max_attempts,
                base_minutes: self.worker.sync_backoff_base_minutes,
                cap_minutes: self.worker.sync_backoff_cap_minutes,
                lease_minutes: self.worker.sync_claim_lease_minutes,
            },
            challenge: ChallengePolicy::default(),
            gateway: GatewayConfig {
                timestamp_drift: SignedDuration::from_secs(i64::from(
                    self.gateway.gateway_timestamp_drift_seconds,
                )),
            },
            worker: WorkerConfig {
                poll_interval: Duration::from_secs(self.worker.sync_poll_interval_seconds.max(1)),
                batch_size: self.worker.sync_batch_size,
                retention: SignedDuration::from_hours(
                    i64::from(self.worker.sync_retention_days) * 24,
                ),
                ..WorkerConfig::default()
            },
        }
    }

    /// Ceiling for submissions per tenant, resource and subject.
    #[must_use]
    pub fn submit_limit(&self) -> RateLimit {
        RateLimit::new(
            self.gateway.submit_rate_max,
            self.gateway.submit_rate_window_seconds,
        )
    }
}
