// Path: crates/engine/src/observer.rs
//! Per-run diagnostics. Every aggregation is handed an observer explicitly, so
//! two concurrent runs can log at different levels without shared state.

use plight_types::address::Address;
use plight_types::aggregation::{AggregationOutput, Signal};
use plight_types::error::{AggregationError, ErrorCode, RpcError};
use plight_types::protocol::Protocol;
use plight_types::window::BlockWindow;

/// Receives progress events from one aggregation run. All methods default to no-ops.
pub trait AggregationObserver: Send + Sync {
    /// The run validated its inputs and is about to query chains.
    fn run_started(&self, _chain_ids: &[u64], _window: &BlockWindow, _subject: &Address) {}
    /// An adapter resolved its contract address.
    fn address_resolved(&self, _chain_id: u64, _protocol: Protocol, _address: &Address) {}
    /// A block range was bisected after a recoverable RPC error.
    fn range_split(&self, _from_block: u64, _to_block: u64, _reason: &RpcError) {}
    /// An adapter finished fetching one event kind.
    fn events_fetched(&self, _chain_id: u64, _protocol: Protocol, _event: &str, _count: usize) {}
    /// An adapter produced its signal.
    fn adapter_finished(&self, _chain_id: u64, _protocol: Protocol, _signal: &Signal) {}
    /// An adapter failed; the run is about to abort.
    fn adapter_failed(&self, _chain_id: u64, _protocol: Protocol, _error: &AggregationError) {}
    /// The run produced a document.
    fn run_finished(&self, _output: &AggregationOutput) {}
    /// The run aborted.
    fn run_failed(&self, _error: &AggregationError) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopObserver;

impl AggregationObserver for NopObserver {}

/// Forwards run events to `tracing` under the `engine` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AggregationObserver for TracingObserver {
    fn run_started(&self, chain_ids: &[u64], window: &BlockWindow, subject: &Address) {
        tracing::info!(
            target: "engine",
            ?chain_ids,
            start_block = window.start_block,
            end_block = window.end_block,
            %subject,
            "aggregation started"
        );
    }

    fn address_resolved(&self, chain_id: u64, protocol: Protocol, address: &Address) {
        tracing::debug!(target: "engine", chain_id, %protocol, %address, "resolved contract");
    }

    fn range_split(&self, from_block: u64, to_block: u64, reason: &RpcError) {
        tracing::debug!(
            target: "fetcher",
            from_block,
            to_block,
            code = reason.code(),
            "splitting block range"
        );
    }

    fn events_fetched(&self, chain_id: u64, protocol: Protocol, event: &str, count: usize) {
        tracing::debug!(target: "engine", chain_id, %protocol, event, count, "fetched events");
    }

    fn adapter_finished(&self, chain_id: u64, protocol: Protocol, signal: &Signal) {
        tracing::debug!(target: "engine", chain_id, %protocol, ?signal, "adapter finished");
    }

    fn adapter_failed(&self, chain_id: u64, protocol: Protocol, error: &AggregationError) {
        tracing::warn!(
            target: "engine",
            chain_id,
            %protocol,
            code = error.code(),
            %error,
            "adapter failed"
        );
    }

    fn run_finished(&self, output: &AggregationOutput) {
        tracing::info!(
            target: "engine",
            chain_id = output.metadata.chain_id,
            aggregation_block = output.metadata.aggregation_block,
            "aggregation finished"
        );
    }

    fn run_failed(&self, error: &AggregationError) {
        tracing::warn!(target: "engine", code = error.code(), %error, "aggregation failed");
    }
}
