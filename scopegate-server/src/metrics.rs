//! Prometheus metrics collection for the ScopeGate server

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use scopegate_core::Decision;
use std::time::Instant;

/// Initialize all metric descriptions
pub fn init_metrics() {
    // Counters
    describe_counter!(
        "scopegate_authorization_requests_total",
        "Total number of authorization requests"
    );
    describe_counter!(
        "scopegate_scope_initializations_total",
        "Total number of scope initialization attempts"
    );
    describe_counter!("scopegate_role_operations_total", "Total number of role operations");
    describe_counter!("scopegate_errors_total", "Total number of errors");

    // Histograms
    describe_histogram!(
        "scopegate_authorization_latency_seconds",
        "Authorization request latency in seconds"
    );
    describe_histogram!(
        "scopegate_collaborator_latency_seconds",
        "Latency of calls to the introspection and policy services"
    );

    // Gauges
    describe_gauge!("scopegate_registered_scopes", "Number of registered scopes");
}

fn decision_label(decision: Decision) -> &'static str {
    match decision {
        Decision::Allow => "allow",
        Decision::Deny(_) => "deny",
    }
}

/// Record an authorization request
pub fn record_authorization(decision: Decision, latency_seconds: f64) {
    let reason = decision
        .deny_reason()
        .map(|r| format!("{:?}", r))
        .unwrap_or_default();
    counter!(
        "scopegate_authorization_requests_total",
        1,
        "decision" => decision_label(decision),
        "reason" => reason
    );
    histogram!("scopegate_authorization_latency_seconds", latency_seconds);
}

/// Record a scope initialization attempt
pub fn record_initialization(success: bool, scopes: usize) {
    let outcome = if success { "ok" } else { "failed" };
    counter!("scopegate_scope_initializations_total", 1, "outcome" => outcome);
    if success {
        gauge!("scopegate_registered_scopes", scopes as f64);
    }
}

/// Record a role operation
pub fn record_role_operation(operation: &'static str) {
    counter!("scopegate_role_operations_total", 1, "operation" => operation);
}

/// Record an error
pub fn record_error(error_type: &str) {
    counter!("scopegate_errors_total", 1, "type" => error_type.to_string());
}

/// Timer for measuring collaborator latency
pub struct LatencyTimer {
    start: Instant,
    service: &'static str,
}

impl LatencyTimer {
    /// Start timing a call to `service`
    pub fn new(service: &'static str) -> Self {
        Self {
            start: Instant::now(),
            service,
        }
    }

    /// Record the elapsed time
    pub fn record(self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        histogram!("scopegate_collaborator_latency_seconds", elapsed, "service" => self.service);
    }
}

/// Storage for Prometheus handle
static PROMETHEUS_HANDLE: std::sync::OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
    std::sync::OnceLock::new();

/// Initialize Prometheus exporter and store its handle
pub fn init_prometheus() -> anyhow::Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;
    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Failed to set Prometheus handle"))?;
    Ok(())
}

/// Get Prometheus metrics string
pub fn get_prometheus_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Prometheus metrics not initialized\n".to_string())
}
