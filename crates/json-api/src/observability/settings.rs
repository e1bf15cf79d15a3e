//! Request tracing knobs read on every request.
//!
//! Integration trace headers are honoured only while spans are exported;
//! with export off a forwarded `traceparent` would parent spans nobody sees.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::{ServerConfig, observability::ObservabilityConfig};

const DEFAULT_SLOW_REQUEST_THRESHOLD_MS: u64 = 1_000;

static SLOW_REQUEST_THRESHOLD_MS: AtomicU64 = AtomicU64::new(DEFAULT_SLOW_REQUEST_THRESHOLD_MS);
static ACCEPT_INTEGRATION_TRACES: AtomicBool = AtomicBool::new(false);

pub(super) fn apply_runtime_config(config: &ServerConfig) {
    let settings = &config.observability;

    SLOW_REQUEST_THRESHOLD_MS.store(settings.slow_request_threshold_ms, Ordering::Relaxed);
    ACCEPT_INTEGRATION_TRACES.store(accepts_integration_traces(settings), Ordering::Relaxed);
}

fn accepts_integration_traces(settings: &ObservabilityConfig) -> bool {
    settings.otel_enabled && settings.otel_parent_propagation_enabled
}

pub(super) fn slow_request_threshold_ms() -> u64 {
    SLOW_REQUEST_THRESHOLD_MS.load(Ordering::Relaxed)
}

pub(super) fn otel_parent_propagation_enabled() -> bool {
    ACCEPT_INTEGRATION_TRACES.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;
    use testresult::TestResult;

    use super::*;

    fn observability(flags: &[&str]) -> Result<ObservabilityConfig, clap::Error> {
        let args = [
            "ranksync-json",
            "--database-url",
            "postgres://localhost/ranksync",
            "--directory-base-url",
            "http://directory.test/v1",
            "--directory-api-key",
            "key",
        ]
        .into_iter()
        .chain(flags.iter().copied());

        Ok(ServerConfig::try_parse_from(args)?.observability)
    }

    #[test]
    fn integration_traces_need_export_enabled() -> TestResult {
        assert!(!accepts_integration_traces(&observability(&[])?));
        assert!(!accepts_integration_traces(&observability(&[
            "--otel-parent-propagation-enabled",
            "true",
        ])?));
        assert!(accepts_integration_traces(&observability(&[
            "--otel-enabled",
            "true",
            "--otel-parent-propagation-enabled",
            "true",
        ])?));

        Ok(())
    }
}
