// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge_vec, Histogram, HistogramVec, IntCounter,
    IntCounterVec, IntGaugeVec,
};

// --- Metric Statics ---
// We use OnceCell to hold the metric collectors. They will be initialized
// exactly once by the `install` function.

static RPC_CALLS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RPC_ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RPC_RANGE_SPLITS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static RPC_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static AGGREGATIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ADAPTER_CALLS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static AGGREGATION_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();
static VERIFICATIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ATTESTATIONS_ISSUED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static ATTESTATION_FAILURES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static REVOCATION_CUTOFF_BLOCK: OnceCell<IntGaugeVec> = OnceCell::new();
static REVOCATION_LAST_SCANNED_BLOCK: OnceCell<IntGaugeVec> = OnceCell::new();
static REVOCATION_SCANS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static REGISTRY_LOOKUPS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static HTTP_REQUESTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static HTTP_REQUEST_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

/// The Prometheus-backed implementation of every sink trait.
#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Runs `$body` with the collector bound to `$m` once `install()` has run.
/// Before installation the observation is dropped.
macro_rules! with_metric {
    ($metric:ident, |$m:ident| $body:expr) => {
        if let Some($m) = $metric.get() {
            $body;
        }
    };
}

fn gauge_value(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl RpcMetricsSink for PrometheusSink {
    fn inc_rpc_calls(&self, method: &str) {
        with_metric!(RPC_CALLS_TOTAL, |m| m.with_label_values(&[method]).inc());
    }
    fn inc_rpc_errors(&self, method: &str, code: &'static str) {
        with_metric!(RPC_ERRORS_TOTAL, |m| m
            .with_label_values(&[method, code])
            .inc());
    }
    fn inc_range_splits(&self) {
        with_metric!(RPC_RANGE_SPLITS_TOTAL, |m| m.inc());
    }
    fn observe_rpc_duration(&self, method: &str, duration_secs: f64) {
        with_metric!(RPC_DURATION_SECONDS, |m| m
            .with_label_values(&[method])
            .observe(duration_secs));
    }
}

impl AggregationMetricsSink for PrometheusSink {
    fn inc_aggregations(&self, outcome: &'static str) {
        with_metric!(AGGREGATIONS_TOTAL, |m| m.with_label_values(&[outcome]).inc());
    }
    fn inc_adapter_calls(&self, protocol: &str, outcome: &'static str) {
        with_metric!(ADAPTER_CALLS_TOTAL, |m| m
            .with_label_values(&[protocol, outcome])
            .inc());
    }
    fn observe_aggregation_duration(&self, duration_secs: f64) {
        with_metric!(AGGREGATION_DURATION_SECONDS, |m| m.observe(duration_secs));
    }
}

impl AttestationMetricsSink for PrometheusSink {
    fn inc_verifications(&self, outcome: &'static str) {
        with_metric!(VERIFICATIONS_TOTAL, |m| m.with_label_values(&[outcome]).inc());
    }
    fn inc_attestations_issued(&self) {
        with_metric!(ATTESTATIONS_ISSUED_TOTAL, |m| m.inc());
    }
    fn inc_attestation_failures(&self, code: &'static str) {
        with_metric!(ATTESTATION_FAILURES_TOTAL, |m| m
            .with_label_values(&[code])
            .inc());
    }
}

impl RevocationMetricsSink for PrometheusSink {
    fn set_cutoff_block(&self, chain_id: u64, block: u64) {
        with_metric!(REVOCATION_CUTOFF_BLOCK, |m| m
            .with_label_values(&[&chain_id.to_string()])
            .set(gauge_value(block)));
    }
    fn set_last_scanned_block(&self, chain_id: u64, block: u64) {
        with_metric!(REVOCATION_LAST_SCANNED_BLOCK, |m| m
            .with_label_values(&[&chain_id.to_string()])
            .set(gauge_value(block)));
    }
    fn inc_scans(&self, outcome: &'static str) {
        with_metric!(REVOCATION_SCANS_TOTAL, |m| m
            .with_label_values(&[outcome])
            .inc());
    }
    fn inc_registry_lookups(&self, revoked: bool) {
        let label = if revoked { "revoked" } else { "valid" };
        with_metric!(REGISTRY_LOOKUPS_TOTAL, |m| m.with_label_values(&[label]).inc());
    }
}

impl HttpMetricsSink for PrometheusSink {
    fn observe_request_duration(&self, route: &str, duration_secs: f64) {
        with_metric!(HTTP_REQUEST_DURATION_SECONDS, |m| m
            .with_label_values(&[route])
            .observe(duration_secs));
    }
    fn inc_requests_total(&self, route: &str, status_code: u16) {
        with_metric!(HTTP_REQUESTS_TOTAL, |m| m
            .with_label_values(&[route, &status_code.to_string()])
            .inc());
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        with_metric!(ERRORS_TOTAL, |m| m.with_label_values(&[kind, variant]).inc());
    }
}

fn already_set<T>(_: T) -> prometheus::Error {
    prometheus::Error::Msg("metrics already installed".to_string())
}

/// Initializes all Prometheus metrics collectors and returns a static reference to the sink.
/// This function must be called only once at application startup.
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    RPC_CALLS_TOTAL
        .set(register_int_counter_vec!(
            "plight_rpc_calls_total",
            "Total JSON-RPC calls to upstream providers.",
            &["method"]
        )?)
        .map_err(already_set)?;
    RPC_ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "plight_rpc_errors_total",
            "Total failed JSON-RPC calls, by error code.",
            &["method", "code"]
        )?)
        .map_err(already_set)?;
    RPC_RANGE_SPLITS_TOTAL
        .set(register_int_counter!(
            "plight_rpc_range_splits_total",
            "Total block ranges bisected after a limit or transport error."
        )?)
        .map_err(already_set)?;
    RPC_DURATION_SECONDS
        .set(register_histogram_vec!(
            "plight_rpc_duration_seconds",
            "Latency of JSON-RPC calls.",
            &["method"],
            exponential_buckets(0.005, 2.0, 14)?
        )?)
        .map_err(already_set)?;
    AGGREGATIONS_TOTAL
        .set(register_int_counter_vec!(
            "plight_aggregations_total",
            "Total aggregation runs, by outcome.",
            &["outcome"]
        )?)
        .map_err(already_set)?;
    ADAPTER_CALLS_TOTAL
        .set(register_int_counter_vec!(
            "plight_adapter_calls_total",
            "Total protocol adapter invocations, by protocol and outcome.",
            &["protocol", "outcome"]
        )?)
        .map_err(already_set)?;
    AGGREGATION_DURATION_SECONDS
        .set(register_histogram!(
            "plight_aggregation_duration_seconds",
            "Wall-clock duration of one aggregation run.",
            exponential_buckets(0.05, 2.0, 14)?
        )?)
        .map_err(already_set)?;
    VERIFICATIONS_TOTAL
        .set(register_int_counter_vec!(
            "plight_verifications_total",
            "Total dual-computation checks, by outcome.",
            &["outcome"]
        )?)
        .map_err(already_set)?;
    ATTESTATIONS_ISSUED_TOTAL
        .set(register_int_counter!(
            "plight_attestations_issued_total",
            "Total signed attestations."
        )?)
        .map_err(already_set)?;
    ATTESTATION_FAILURES_TOTAL
        .set(register_int_counter_vec!(
            "plight_attestation_failures_total",
            "Total refused attestations, by error code.",
            &["code"]
        )?)
        .map_err(already_set)?;
    REVOCATION_CUTOFF_BLOCK
        .set(register_int_gauge_vec!(
            "plight_revocation_cutoff_block",
            "Highest block at which a disqualifying event was observed.",
            &["chain_id"]
        )?)
        .map_err(already_set)?;
    REVOCATION_LAST_SCANNED_BLOCK
        .set(register_int_gauge_vec!(
            "plight_revocation_last_scanned_block",
            "Last block covered by a successful revocation scan.",
            &["chain_id"]
        )?)
        .map_err(already_set)?;
    REVOCATION_SCANS_TOTAL
        .set(register_int_counter_vec!(
            "plight_revocation_scans_total",
            "Total revocation scans, by outcome.",
            &["outcome"]
        )?)
        .map_err(already_set)?;
    REGISTRY_LOOKUPS_TOTAL
        .set(register_int_counter_vec!(
            "plight_registry_lookups_total",
            "Total revocation registry lookups, by result.",
            &["result"]
        )?)
        .map_err(already_set)?;
    HTTP_REQUESTS_TOTAL
        .set(register_int_counter_vec!(
            "plight_http_requests_total",
            "Total HTTP requests.",
            &["route", "status"]
        )?)
        .map_err(already_set)?;
    HTTP_REQUEST_DURATION_SECONDS
        .set(register_histogram_vec!(
            "plight_http_request_duration_seconds",
            "Latency of HTTP requests.",
            &["route"],
            exponential_buckets(0.001, 2.0, 15)?
        )?)
        .map_err(already_set)?;
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "plight_errors_total",
            "Total number of errors, categorized by type and variant.",
            &["kind", "variant"]
        )?)
        .map_err(already_set)?;

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
