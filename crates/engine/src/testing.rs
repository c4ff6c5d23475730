// Path: crates/engine/src/testing.rs
//! In-memory RPC doubles with scripted logs and failures.

use crate::rpc::{EthRpc, Log, LogFilter, RpcProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use plight_types::error::RpcError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A log emitted by the zero address, with empty data.
pub fn log_at(block: u64, tx: &str, log_index: u64, topics: &[&str]) -> Log {
    Log {
        address: format!("0x{}", "00".repeat(20)),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        data: "0x".into(),
        block_number: block,
        transaction_hash: tx.to_string(),
        log_index,
    }
}

/// A scripted [`EthRpc`].
///
/// Logs are matched against filters the way a node would: by block range, emitting
/// address and positional topics. Failures are injected by range width.
#[derive(Debug, Default)]
pub struct MockEthRpc {
    logs: Mutex<Vec<Log>>,
    max_span: Option<u64>,
    failure: Mutex<Option<(u64, RpcError)>>,
    head: AtomicU64,
    head_error: Mutex<Option<RpcError>>,
    requested: Mutex<Vec<(u64, u64)>>,
    succeeded: Mutex<Vec<(u64, u64)>>,
}

impl MockEthRpc {
    /// An empty chain at head 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any query spanning more than `max_span` blocks with a limit error.
    pub fn with_max_span(mut self, max_span: u64) -> Self {
        self.max_span = Some(max_span);
        self
    }

    /// Sets the block reported by `eth_blockNumber`.
    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Makes `eth_blockNumber` fail.
    pub fn fail_head(&self, err: RpcError) {
        *self.head_error.lock() = Some(err);
    }

    /// Adds a log to the chain.
    pub fn push_log(&self, log: Log) {
        self.logs.lock().push(log);
    }

    /// Fails every `eth_getLogs` call spanning more than `width` blocks with `err`.
    pub fn fail_spans_wider_than(&self, width: u64, err: RpcError) {
        *self.failure.lock() = Some((width, err));
    }

    /// Fails every `eth_getLogs` call.
    pub fn fail_all(&self, err: RpcError) {
        self.fail_spans_wider_than(0, err);
    }

    /// Removes an injected failure.
    pub fn heal(&self) {
        *self.failure.lock() = None;
        *self.head_error.lock() = None;
    }

    /// Every range passed to `eth_getLogs`, in call order.
    pub fn requested_ranges(&self) -> Vec<(u64, u64)> {
        self.requested.lock().clone()
    }

    /// The ranges that returned successfully.
    pub fn successful_ranges(&self) -> Vec<(u64, u64)> {
        self.succeeded.lock().clone()
    }

    fn matches(filter: &LogFilter, log: &Log) -> bool {
        if log.block_number < filter.from_block || log.block_number > filter.to_block {
            return false;
        }
        if let Some(addr) = filter.address {
            if !log.address.eq_ignore_ascii_case(&addr.to_string()) {
                return false;
            }
        }
        filter.topics.iter().enumerate().all(|(i, want)| match want {
            None => true,
            Some(t) => log.topic(i).is_some_and(|have| have.eq_ignore_ascii_case(t)),
        })
    }
}

#[async_trait]
impl EthRpc for MockEthRpc {
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError> {
        let range = (filter.from_block, filter.to_block);
        self.requested.lock().push(range);
        let span = filter.to_block - filter.from_block + 1;
        if let Some(max) = self.max_span {
            if span > max {
                return Err(RpcError::Limit(format!(
                    "query exceeds max block range {max}"
                )));
            }
        }
        if let Some((width, err)) = self.failure.lock().as_ref() {
            if span > *width {
                return Err(err.clone());
            }
        }
        self.succeeded.lock().push(range);
        Ok(self
            .logs
            .lock()
            .iter()
            .filter(|log| Self::matches(filter, log))
            .cloned()
            .collect())
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        if let Some(err) = self.head_error.lock().as_ref() {
            return Err(err.clone());
        }
        Ok(self.head.load(Ordering::SeqCst))
    }
}

/// Serves one [`MockEthRpc`] per chain.
#[derive(Debug, Default, Clone)]
pub struct MockRpcProvider {
    chains: HashMap<u64, Arc<MockEthRpc>>,
}

impl MockRpcProvider {
    /// A provider with no chains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rpc` for `chain_id`.
    pub fn with_chain(mut self, chain_id: u64, rpc: Arc<MockEthRpc>) -> Self {
        self.chains.insert(chain_id, rpc);
        self
    }

    /// The mock registered for `chain_id`.
    pub fn chain(&self, chain_id: u64) -> Option<Arc<MockEthRpc>> {
        self.chains.get(&chain_id).cloned()
    }
}

impl RpcProvider for MockRpcProvider {
    fn client(&self, chain_id: u64) -> Result<Arc<dyn EthRpc>, RpcError> {
        self.chains
            .get(&chain_id)
            .map(|rpc| rpc.clone() as Arc<dyn EthRpc>)
            .ok_or(RpcError::MissingEndpoint(chain_id))
    }
}
