// Path: crates/engine/src/rpc.rs
//! The JSON-RPC seam between the engine and the chains it observes.

use async_trait::async_trait;
use dashmap::DashMap;
use plight_telemetry::{rpc_metrics, time::Timer};
use plight_types::address::Address;
use plight_types::config::{FetcherConfig, PlightConfig};
use plight_types::error::{ErrorCode, RpcError};
use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// The JSON-RPC error code providers use for "query returned too many results".
pub const LIMIT_EXCEEDED_CODE: i64 = -32005;

const BASE_BACKOFF_MS: u64 = 50;
const MAX_BACKOFF_MS: u64 = 800;
const MAX_RETRY_AFTER_SECS: u64 = 5;

/// An EVM event log as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// The emitting contract.
    pub address: String,
    /// `topic0` (the event signature hash) followed by the indexed arguments.
    pub topics: Vec<String>,
    /// ABI-encoded non-indexed arguments.
    #[serde(default)]
    pub data: String,
    /// The block the log was included in.
    #[serde(with = "quantity")]
    pub block_number: u64,
    /// The transaction that emitted the log.
    pub transaction_hash: String,
    /// The log's position within its block.
    #[serde(with = "quantity")]
    pub log_index: u64,
}

impl Log {
    /// The identity used to de-duplicate logs returned by overlapping queries.
    pub fn key(&self) -> (u64, &str, u64) {
        (self.block_number, self.transaction_hash.as_str(), self.log_index)
    }

    /// The topic at `position`. Position 0 is the event signature hash.
    pub fn topic(&self, position: usize) -> Option<&str> {
        self.topics.get(position).map(String::as_str)
    }

    /// The 32-byte word at `index` in the data section, as lowercase hex without prefix.
    pub fn data_word(&self, index: usize) -> Option<String> {
        let body = self.data.strip_prefix("0x").unwrap_or(&self.data);
        let start = index.checked_mul(64)?;
        body.get(start..start.checked_add(64)?)
            .map(|w| w.to_ascii_lowercase())
    }
}

/// `0x`-prefixed hex quantities.
mod quantity {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{v:x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_quantity(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u64, String> {
    let body = raw
        .strip_prefix("0x")
        .ok_or_else(|| format!("quantity '{raw}' is missing the 0x prefix"))?;
    u64::from_str_radix(body, 16).map_err(|e| format!("bad quantity '{raw}': {e}"))
}

/// A single `eth_getLogs` filter over an inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Restricts results to one emitting contract. `None` queries every contract.
    pub address: Option<Address>,
    /// Positional topic filters; `None` matches anything at that position.
    pub topics: Vec<Option<String>>,
    /// First block, inclusive.
    pub from_block: u64,
    /// Last block, inclusive.
    pub to_block: u64,
}

impl LogFilter {
    /// The same filter over a different range.
    pub fn with_range(&self, from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block,
            ..self.clone()
        }
    }

    /// The JSON-RPC parameter object. Trailing wildcard topics are dropped.
    pub fn to_params(&self) -> Value {
        let mut topics: Vec<Value> = self
            .topics
            .iter()
            .map(|t| t.as_ref().map_or(Value::Null, |s| Value::String(s.clone())))
            .collect();
        while topics.last().is_some_and(Value::is_null) {
            topics.pop();
        }
        let mut params = json!({
            "fromBlock": format!("0x{:x}", self.from_block),
            "toBlock": format!("0x{:x}", self.to_block),
            "topics": topics,
        });
        if let (Some(addr), Some(obj)) = (self.address, params.as_object_mut()) {
            obj.insert("address".into(), Value::String(addr.to_string()));
        }
        params
    }
}

/// The subset of the Ethereum JSON-RPC API the pipeline needs.
#[async_trait]
pub trait EthRpc: Send + Sync {
    /// `eth_getLogs` over the filter's range.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError>;
    /// `eth_blockNumber`.
    async fn block_number(&self) -> Result<u64, RpcError>;
}

/// Hands out an RPC client per chain.
pub trait RpcProvider: Send + Sync {
    /// The client for `chain_id`, or `MissingEndpoint`.
    fn client(&self, chain_id: u64) -> Result<Arc<dyn EthRpc>, RpcError>;
}

/// Classifies a JSON-RPC error object. Range and response-size rejections are
/// recoverable by bisection; everything else is a node error.
pub fn classify_rpc_error(code: i64, message: &str) -> RpcError {
    if code == LIMIT_EXCEEDED_CODE || is_limit_message(message) {
        RpcError::Limit(message.to_string())
    } else {
        RpcError::Node {
            code,
            message: message.to_string(),
        }
    }
}

fn is_limit_message(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    ["limit", "too large", "too many", "size", "exceed"]
        .iter()
        .any(|needle| m.contains(needle))
}

fn retry_delay(attempt: u32, retry_after: Option<&HeaderValue>) -> Duration {
    if let Some(secs) = retry_after
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
    {
        return Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS));
    }
    let ms = BASE_BACKOFF_MS
        .saturating_mul(1u64 << attempt.min(16))
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(ms)
}

fn ascii_snippet(bytes: &[u8]) -> String {
    let s = String::from_utf8_lossy(bytes);
    let s: String = s.trim().chars().take(160).collect();
    s.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

/// A JSON-RPC client over HTTP(S).
pub struct HttpEthRpc {
    url: String,
    client: Client,
    retries: u32,
    next_id: AtomicU64,
}

impl std::fmt::Debug for HttpEthRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL commonly embeds a provider API key.
        f.debug_struct("HttpEthRpc")
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

impl HttpEthRpc {
    /// Builds a client with the configured per-request timeout and retry budget.
    pub fn new(url: impl Into<String>, config: &FetcherConfig) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
            retries: config.http_retries,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        rpc_metrics().inc_rpc_calls(method);
        let _timer = Timer::new(|secs| rpc_metrics().observe_rpc_duration(method, secs));
        let result = self.call_inner(method, params).await;
        if let Err(e) = &result {
            rpc_metrics().inc_rpc_errors(method, e.code());
        }
        result
    }

    async fn call_inner<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        // Retry loop (429, 5xx, connection errors and timeouts).
        let mut attempt = 0u32;
        let (status, bytes) = loop {
            let resp = match self.client.post(&self.url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    if attempt < self.retries {
                        tracing::debug!(
                            target: "rpc",
                            method,
                            attempt,
                            error = %e,
                            "send error; retrying"
                        );
                        sleep(retry_delay(attempt, None)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(RpcError::Transport(format!(
                        "{method} failed after {attempt} retries: {e}"
                    )));
                }
            };

            let status = resp.status();
            let retry_after = resp.headers().get(RETRY_AFTER).cloned();
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| RpcError::Transport(format!("{method}: reading body: {e}")))?;

            if status.as_u16() == 429 || status.is_server_error() {
                if attempt < self.retries {
                    let delay = retry_delay(attempt, retry_after.as_ref());
                    tracing::debug!(
                        target: "rpc",
                        method,
                        status = status.as_u16(),
                        ?delay,
                        body = %ascii_snippet(&bytes),
                        "retryable HTTP status; backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(RpcError::Transport(format!(
                    "{method}: HTTP {} after {} retries: {}",
                    status.as_u16(),
                    self.retries,
                    ascii_snippet(&bytes)
                )));
            }
            break (status, bytes);
        };

        // Some providers answer oversize queries with a 4xx and a JSON-RPC error
        // body; others with plain text. Both are worth decoding before giving up.
        let decoded: Result<JsonRpcResponse, _> = serde_json::from_slice(&bytes);
        let resp = match decoded {
            Ok(r) => r,
            Err(_) if !status.is_success() => {
                let snippet = ascii_snippet(&bytes);
                return Err(if is_limit_message(&snippet) {
                    RpcError::Limit(format!("HTTP {}: {snippet}", status.as_u16()))
                } else {
                    RpcError::Transport(format!("{method}: HTTP {}: {snippet}", status.as_u16()))
                });
            }
            Err(e) => return Err(RpcError::Decode(format!("{method}: {e}"))),
        };

        if let Some(err) = resp.error {
            return Err(classify_rpc_error(err.code, &err.message));
        }
        let result = resp
            .result
            .ok_or_else(|| RpcError::Decode(format!("{method}: response has no result")))?;
        serde_json::from_value(result).map_err(|e| RpcError::Decode(format!("{method}: {e}")))
    }
}

#[async_trait]
impl EthRpc for HttpEthRpc {
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError> {
        self.call("eth_getLogs", json!([filter.to_params()])).await
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        let raw: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&raw).map_err(RpcError::Decode)
    }
}

/// Builds one [`HttpEthRpc`] per chain from configuration and caches it.
pub struct ConfigRpcProvider {
    config: Arc<PlightConfig>,
    clients: DashMap<u64, Arc<dyn EthRpc>>,
}

impl ConfigRpcProvider {
    /// Creates a provider that resolves endpoints lazily.
    pub fn new(config: Arc<PlightConfig>) -> Self {
        Self {
            config,
            clients: DashMap::new(),
        }
    }
}

impl RpcProvider for ConfigRpcProvider {
    fn client(&self, chain_id: u64) -> Result<Arc<dyn EthRpc>, RpcError> {
        if let Some(existing) = self.clients.get(&chain_id) {
            return Ok(existing.clone());
        }
        let url = self.config.rpc_url(chain_id)?;
        let client: Arc<dyn EthRpc> = Arc::new(HttpEthRpc::new(url, &self.config.fetcher)?);
        Ok(self.clients.entry(chain_id).or_insert(client).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_classification() {
        assert!(matches!(
            classify_rpc_error(-32005, "anything"),
            RpcError::Limit(_)
        ));
        assert!(matches!(
            classify_rpc_error(-32000, "execution reverted"),
            RpcError::Node { code: -32000, .. }
        ));
        assert!(matches!(
            classify_rpc_error(-32602, "Log response size exceeded"),
            RpcError::Limit(_)
        ));
        assert!(matches!(
            classify_rpc_error(-32000, "block range is too large"),
            RpcError::Limit(_)
        ));
        assert!(matches!(
            classify_rpc_error(-32000, "Too Many logs"),
            RpcError::Limit(_)
        ));
        assert!(matches!(
            classify_rpc_error(-32601, "method not found"),
            RpcError::Node { code: -32601, .. }
        ));
    }

    #[test]
    fn test_filter_params_drop_trailing_wildcards() {
        let filter = LogFilter {
            address: None,
            topics: vec![Some("0xaa".into()), None, Some("0xbb".into()), None],
            from_block: 100,
            to_block: 255,
        };
        let params = filter.to_params();
        assert_eq!(params["fromBlock"], "0x64");
        assert_eq!(params["toBlock"], "0xff");
        assert_eq!(params["topics"], json!(["0xaa", null, "0xbb"]));
        assert!(params.get("address").is_none());
    }

    #[test]
    fn test_filter_params_include_address() {
        let addr: Address = "0x87870bca3f3fd6335c3f4ce8392d69350b4fa4e2".parse().unwrap();
        let filter = LogFilter {
            address: Some(addr),
            topics: vec![Some("0xaa".into())],
            from_block: 1,
            to_block: 2,
        };
        assert_eq!(
            filter.to_params()["address"],
            "0x87870bca3f3fd6335c3f4ce8392d69350b4fa4e2"
        );
    }

    #[test]
    fn test_log_decodes_hex_quantities() {
        let raw = json!({
            "address": "0x0000000000000000000000000000000000000001",
            "topics": ["0x01"],
            "data": "0x",
            "blockNumber": "0x10",
            "transactionHash": "0xabc",
            "logIndex": "0x2",
            "removed": false
        });
        let log: Log = serde_json::from_value(raw).unwrap();
        assert_eq!(log.block_number, 16);
        assert_eq!(log.log_index, 2);
        assert!(serde_json::from_value::<Log>(json!({
            "address": "0x01", "topics": [], "data": "0x",
            "blockNumber": "16", "transactionHash": "0xabc", "logIndex": "0x0"
        }))
        .is_err());
    }

    #[test]
    fn test_data_word_extraction() {
        let log = Log {
            address: String::new(),
            topics: vec![],
            data: format!("0x{}{}", "00".repeat(32), "AB".repeat(32)),
            block_number: 1,
            transaction_hash: "0x1".into(),
            log_index: 0,
        };
        assert_eq!(log.data_word(0).unwrap(), "00".repeat(32));
        assert_eq!(log.data_word(1).unwrap(), "ab".repeat(32));
        assert!(log.data_word(2).is_none());
    }

    #[test]
    fn test_retry_delay_backs_off_and_caps() {
        assert_eq!(retry_delay(0, None), Duration::from_millis(50));
        assert_eq!(retry_delay(2, None), Duration::from_millis(200));
        assert_eq!(retry_delay(10, None), Duration::from_millis(800));
        let header = HeaderValue::from_static("30");
        assert_eq!(retry_delay(0, Some(&header)), Duration::from_secs(5));
    }

    #[test]
    fn test_provider_reports_missing_endpoint() {
        let config = PlightConfig::from_toml_str(
            "[[chains]]\nchain_id = 1\nrpc_env = \"PLIGHT_TEST_UNSET_RPC_VAR\"\n",
        )
        .unwrap();
        let provider = ConfigRpcProvider::new(Arc::new(config));
        assert!(matches!(
            provider.client(1),
            Err(RpcError::MissingEndpoint(1))
        ));
    }
}
