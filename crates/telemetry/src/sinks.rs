// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured RPC metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn rpc_metrics() -> &'static dyn RpcMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured aggregation metrics sink.
pub fn aggregation_metrics() -> &'static dyn AggregationMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured attestation metrics sink.
pub fn attestation_metrics() -> &'static dyn AttestationMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured revocation metrics sink.
pub fn revocation_metrics() -> &'static dyn RevocationMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured HTTP metrics sink.
pub fn http_metrics() -> &'static dyn HttpMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured error metrics sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics related to upstream JSON-RPC providers.
pub trait RpcMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for JSON-RPC calls, labeled by method.
    fn inc_rpc_calls(&self, method: &str);
    /// Increments a counter for failed JSON-RPC calls, labeled by method and error code.
    fn inc_rpc_errors(&self, method: &str, code: &'static str);
    /// Increments the counter of block ranges bisected after a limit or transport error.
    fn inc_range_splits(&self);
    /// Observes the latency of a single JSON-RPC call.
    fn observe_rpc_duration(&self, method: &str, duration_secs: f64);
}
impl RpcMetricsSink for NopSink {
    fn inc_rpc_calls(&self, _method: &str) {}
    fn inc_rpc_errors(&self, _method: &str, _code: &'static str) {}
    fn inc_range_splits(&self) {}
    fn observe_rpc_duration(&self, _method: &str, _duration_secs: f64) {}
}

/// A sink for metrics related to aggregation runs.
pub trait AggregationMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for completed aggregation runs, labeled by outcome.
    fn inc_aggregations(&self, outcome: &'static str);
    /// Increments a counter for adapter invocations, labeled by protocol and outcome.
    fn inc_adapter_calls(&self, protocol: &str, outcome: &'static str);
    /// Observes the wall-clock duration of one aggregation run.
    fn observe_aggregation_duration(&self, duration_secs: f64);
}
impl AggregationMetricsSink for NopSink {
    fn inc_aggregations(&self, _outcome: &'static str) {}
    fn inc_adapter_calls(&self, _protocol: &str, _outcome: &'static str) {}
    fn observe_aggregation_duration(&self, _duration_secs: f64) {}
}

/// A sink for metrics related to verification and attestation issuance.
pub trait AttestationMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for dual-computation checks, labeled by outcome.
    fn inc_verifications(&self, outcome: &'static str);
    /// Increments the counter of signed attestations.
    fn inc_attestations_issued(&self);
    /// Increments a counter for refused attestations, labeled by error code.
    fn inc_attestation_failures(&self, code: &'static str);
}
impl AttestationMetricsSink for NopSink {
    fn inc_verifications(&self, _outcome: &'static str) {}
    fn inc_attestations_issued(&self) {}
    fn inc_attestation_failures(&self, _code: &'static str) {}
}

/// A sink for metrics related to the revocation tracker and registry.
pub trait RevocationMetricsSink: Send + Sync + std::fmt::Debug {
    /// Sets the gauge for the persisted revocation cutoff block.
    fn set_cutoff_block(&self, chain_id: u64, block: u64);
    /// Sets the gauge for the last fully scanned block.
    fn set_last_scanned_block(&self, chain_id: u64, block: u64);
    /// Increments a counter for scans, labeled by outcome.
    fn inc_scans(&self, outcome: &'static str);
    /// Increments a counter for registry lookups, labeled by result.
    fn inc_registry_lookups(&self, revoked: bool);
}
impl RevocationMetricsSink for NopSink {
    fn set_cutoff_block(&self, _chain_id: u64, _block: u64) {}
    fn set_last_scanned_block(&self, _chain_id: u64, _block: u64) {}
    fn inc_scans(&self, _outcome: &'static str) {}
    fn inc_registry_lookups(&self, _revoked: bool) {}
}

/// A sink for metrics related to the public HTTP servers.
pub trait HttpMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of an HTTP request, labeled by route.
    fn observe_request_duration(&self, route: &str, duration_secs: f64);
    /// Increments a counter for total HTTP requests, labeled by route and status code.
    fn inc_requests_total(&self, route: &str, status_code: u16);
}
impl HttpMetricsSink for NopSink {
    fn observe_request_duration(&self, _route: &str, _duration_secs: f64) {}
    fn inc_requests_total(&self, _route: &str, _status_code: u16) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    RpcMetricsSink
    + AggregationMetricsSink
    + AttestationMetricsSink
    + RevocationMetricsSink
    + HttpMetricsSink
    + ErrorMetricsSink
{
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T where
    T: RpcMetricsSink
        + AggregationMetricsSink
        + AttestationMetricsSink
        + RevocationMetricsSink
        + HttpMetricsSink
        + ErrorMetricsSink
{
}
