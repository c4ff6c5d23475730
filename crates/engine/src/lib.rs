// Path: crates/engine/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]
//! # plight Aggregation Engine
//!
//! Turns raw EVM event logs into the canonical, policy-neutral behavioral summary.
//!
//! The crate is layered leaf to root:
//!
//! - [`rpc`]: the `EthRpc` seam and its reqwest-backed JSON-RPC client.
//! - [`fetcher`]: chunked `eth_getLogs` retrieval with adaptive range splitting.
//! - [`matrix`]: the static (protocol, primitive, chain, contract) address table.
//! - [`adapters`]: one declarative table of event filters driving a generic
//!   fetch-and-count.
//! - [`engine`]: the orchestrator that merges adapter signals across chains and
//!   emits canonical JSON.

pub mod adapters;
pub mod engine;
pub mod fetcher;
pub mod matrix;
pub mod observer;
pub mod rpc;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use engine::{AggregationEngine, Aggregator};
pub use fetcher::LogFetcher;
pub use observer::{AggregationObserver, NopObserver, TracingObserver};
pub use rpc::{ConfigRpcProvider, EthRpc, HttpEthRpc, Log, LogFilter, RpcProvider};
