//! Directory Config

use clap::Args;

/// Directory service client settings.
#[derive(Debug, Args)]
pub struct DirectorySettings {
    /// Directory API base URL
    #[arg(long, env = "DIRECTORY_BASE_URL")]
    pub directory_base_url: String,

    /// Directory API key, sent as `x-api-key`
    #[arg(long, env = "DIRECTORY_API_KEY", hide_env_values = true)]
    pub directory_api_key: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "DIRECTORY_TIMEOUT_SECONDS", default_value_t = 10)]
    pub directory_timeout_seconds: u64,

    /// Calls per minute allowed on each directory endpoint
    #[arg(long, env = "DIRECTORY_CALLS_PER_MINUTE", default_value_t = 60)]
    pub directory_calls_per_minute: u32,
}
