//! Logging and OpenTelemetry tracing for the ScopeGate server

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{self, RandomIdGenerator, Sampler},
    Resource,
};
use std::time::Duration;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,scopegate=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize OpenTelemetry with an OTLP exporter
pub fn init_telemetry(
    service_name: &str,
    endpoint: &str,
) -> anyhow::Result<opentelemetry_sdk::trace::Tracer> {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(3));

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            trace::config()
                .with_sampler(get_sampler())
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)?;

    Ok(tracer)
}

/// Sampler configured through `OTEL_TRACES_SAMPLER_ARG`
fn get_sampler() -> Sampler {
    let sample_rate = std::env::var("OTEL_TRACES_SAMPLER_ARG")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(1.0);

    sampler_for(sample_rate)
}

fn sampler_for(sample_rate: f64) -> Sampler {
    if sample_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if sample_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(sample_rate)
    }
}

/// Initialize console logging plus OpenTelemetry export
pub fn init_tracing_stack(service_name: &str, endpoint: &str) -> anyhow::Result<()> {
    let tracer = init_telemetry(service_name, endpoint)?;

    let otel_layer = OpenTelemetryLayer::new(tracer);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_thread_names(true);

    Registry::default()
        .with(env_filter())
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Initialize console logging only
pub fn init_console_logging() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install subscriber: {}", e))
}

/// Shutdown OpenTelemetry provider
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// Span covering one authorization request
pub fn authorization_span(method: &str, uri: &str) -> tracing::Span {
    tracing::info_span!(
        "authorize_request",
        method = %method,
        uri = %uri,
        otel.kind = "server",
        decision = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
        otel.status_code = tracing::field::Empty,
    )
}

/// Record decision in current span
pub fn record_decision(decision: &str, latency_ms: f64) {
    let span = tracing::Span::current();
    span.record("decision", decision);
    span.record("latency_ms", latency_ms);
    span.record("otel.status_code", "OK");
}

/// Child span for a call to an external collaborator
#[tracing::instrument(name = "collaborator_call", skip(f), fields(otel.kind = "client"))]
pub async fn trace_collaborator_call<F, R>(service: &'static str, f: F) -> R
where
    F: std::future::Future<Output = R>,
{
    f.await
}
