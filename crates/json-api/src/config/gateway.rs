//! Gateway Config

use clap::Args;

/// Ingress gateway settings.
#[derive(Debug, Args)]
pub struct GatewaySettings {
    /// Accepted distance between a request timestamp and server time
    #[arg(long, env = "GATEWAY_TIMESTAMP_DRIFT_SECONDS", default_value_t = 300)]
    pub gateway_timestamp_drift_seconds: u32,

    /// Reject unsigned requests to mutating `/sync` endpoints
    #[arg(
        long,
        env = "REQUIRE_SIGNED_MUTATIONS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub require_signed_mutations: bool,

    /// Submissions allowed per tenant, resource and subject within the window
    #[arg(long, env = "SUBMIT_RATE_MAX", default_value_t = 3)]
    pub submit_rate_max: u32,

    /// Submission rate window in seconds
    #[arg(long, env = "SUBMIT_RATE_WINDOW_SECONDS", default_value_t = 600)]
    pub submit_rate_window_seconds: u32,
}
