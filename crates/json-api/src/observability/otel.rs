//! Trace export for the ranksync API.
//!
//! Spans carry the `ranksync` namespace so the API and its sync worker group
//! together in the collector, whatever `OTEL_SERVICE_NAME` says.

use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};

use crate::config::{ServerConfig, observability::ObservabilityConfig};

use super::ObservabilityError;

const SERVICE_NAMESPACE: &str = "ranksync";

pub(super) fn build_tracer_provider(
    config: &ServerConfig,
) -> Result<SdkTracerProvider, ObservabilityError> {
    let settings = &config.observability;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(settings.otel_exporter_otlp_endpoint.clone())
        .with_timeout(Duration::from_secs(
            settings.otel_exporter_otlp_timeout_seconds,
        ))
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            sample_ratio(settings.otel_trace_sample_ratio),
        ))))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(service_resource(settings))
        .with_batch_exporter(exporter)
        .build())
}

fn service_resource(settings: &ObservabilityConfig) -> Resource {
    Resource::builder_empty()
        .with_service_name(settings.otel_service_name.clone())
        .with_attributes([
            KeyValue::new("service.namespace", SERVICE_NAMESPACE),
            KeyValue::new("service.version", settings.otel_service_version.clone()),
            KeyValue::new(
                "deployment.environment.name",
                settings.otel_deployment_environment.clone(),
            ),
        ])
        .build()
}

/// Root-span sampling ratio. A malformed ratio samples everything.
fn sample_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        1.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;
    use opentelemetry::{Key, Value};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn resource_names_the_ranksync_namespace() -> TestResult {
        let config = ServerConfig::try_parse_from([
            "ranksync-json",
            "--database-url",
            "postgres://localhost/ranksync",
            "--directory-base-url",
            "http://directory.test/v1",
            "--directory-api-key",
            "key",
            "--otel-deployment-environment",
            "staging",
        ])?;

        let resource = service_resource(&config.observability);

        assert_eq!(
            resource.get(&Key::from_static_str("service.namespace")),
            Some(Value::from(SERVICE_NAMESPACE))
        );
        assert_eq!(
            resource.get(&Key::from_static_str("service.name")),
            Some(Value::from("ranksync-json"))
        );
        assert_eq!(
            resource.get(&Key::from_static_str("deployment.environment.name")),
            Some(Value::from("staging"))
        );

        Ok(())
    }

    #[test]
    fn sample_ratio_stays_within_bounds() {
        assert!((sample_ratio(0.25) - 0.25).abs() < f64::EPSILON);
        assert!((sample_ratio(4.0) - 1.0).abs() < f64::EPSILON);
        assert!(sample_ratio(-1.0).abs() < f64::EPSILON);
        assert!((sample_ratio(f64::NAN) - 1.0).abs() < f64::EPSILON);
    }
}
