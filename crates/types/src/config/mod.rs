// Path: crates/types/src/config/mod.rs

//! Shared configuration structures for the engine, notary, tracker and registry.
use crate::attestation::{Environment, DEFAULT_TTL_SECS};
use crate::error::{ConfigError, RpcError};
use crate::protocol::{
    CHAIN_ARBITRUM, CHAIN_AVALANCHE, CHAIN_BASE, CHAIN_ETHEREUM, CHAIN_OPTIMISM, CHAIN_POLYGON,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration file (`plight.toml`).
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PlightConfig {
    /// Per-chain RPC endpoints. Chains absent here fall back to [`default_chains`].
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    /// Log fetcher tuning.
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// Notary service.
    #[serde(default)]
    pub notary: NotaryConfig,
    /// Revocation tracker.
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Revocation registry service.
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl PlightConfig {
    /// Loads a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parses a configuration document and checks value ranges.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetcher.chunk_size == 0 {
            return Err(ConfigError::Invalid("fetcher.chunk_size must be > 0".into()));
        }
        if self.notary.ttl_secs == 0 {
            return Err(ConfigError::Invalid("notary.ttl_secs must be > 0".into()));
        }
        if self.notary.request_timeout_secs == 0 || self.notary.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "notary.request_timeout_secs and notary.max_concurrency must be > 0".into(),
            ));
        }
        if self.tracker.max_blocks == 0 {
            return Err(ConfigError::Invalid("tracker.max_blocks must be > 0".into()));
        }
        Ok(())
    }

    /// The chain entry for `chain_id`, from this file or the built-in table.
    pub fn chain(&self, chain_id: u64) -> Option<ChainConfig> {
        self.chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .cloned()
            .or_else(|| default_chains().into_iter().find(|c| c.chain_id == chain_id))
    }

    /// Resolves the RPC URL for a chain: an explicit `rpc_url` wins, then the
    /// environment variable named by `rpc_env`.
    pub fn rpc_url(&self, chain_id: u64) -> Result<String, RpcError> {
        self.chain(chain_id)
            .and_then(|c| c.resolve_url())
            .ok_or(RpcError::MissingEndpoint(chain_id))
    }
}

/// An RPC endpoint for one chain.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// The EVM chain id.
    pub chain_id: u64,
    /// A human-readable label used in logs.
    #[serde(default)]
    pub name: String,
    /// An explicit RPC URL.
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// The environment variable holding the RPC URL.
    #[serde(default)]
    pub rpc_env: Option<String>,
}

impl ChainConfig {
    fn resolve_url(&self) -> Option<String> {
        self.rpc_url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| {
                self.rpc_env
                    .as_deref()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|u| !u.is_empty())
            })
    }
}

/// The built-in chain table. URLs come from the environment.
pub fn default_chains() -> Vec<ChainConfig> {
    [
        (CHAIN_ETHEREUM, "ethereum", "ETH_RPC_URL"),
        (CHAIN_OPTIMISM, "optimism", "OP_RPC_URL"),
        (CHAIN_POLYGON, "polygon", "POLYGON_RPC_URL"),
        (CHAIN_BASE, "base", "BASE_RPC_URL"),
        (CHAIN_ARBITRUM, "arbitrum", "ARB_RPC_URL"),
        (CHAIN_AVALANCHE, "avalanche", "AVAX_RPC_URL"),
    ]
    .into_iter()
    .map(|(chain_id, name, env)| ChainConfig {
        chain_id,
        name: name.to_string(),
        rpc_url: None,
        rpc_env: Some(env.to_string()),
    })
    .collect()
}

/// Tuning for chunked, adaptively split `eth_getLogs` retrieval.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Blocks per top-level chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Transport errors on ranges wider than this are split; narrower ranges fail.
    #[serde(default = "default_split_threshold")]
    pub split_threshold: u64,
    /// Maximum bisection depth within one chunk.
    #[serde(default = "default_max_split_depth")]
    pub max_split_depth: u32,
    /// HTTP-level retries for a single request before it is reported as a transport error.
    #[serde(default = "default_http_retries")]
    pub http_retries: u32,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_chunk_size() -> u64 {
    10_000
}
fn default_split_threshold() -> u64 {
    2_000
}
fn default_max_split_depth() -> u32 {
    32
}
fn default_http_retries() -> u32 {
    3
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            split_threshold: default_split_threshold(),
            max_split_depth: default_max_split_depth(),
            http_retries: default_http_retries(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// What the issuer does when the client payload differs from the trusted re-execution.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Log the mismatch and attest to the trusted payload.
    #[default]
    Permissive,
    /// Refuse to attest.
    Strict,
}

/// Configuration for the notary HTTP service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotaryConfig {
    /// Socket address to bind.
    #[serde(default = "default_notary_addr")]
    pub listen_addr: String,
    /// Deployment environment bound into every envelope.
    #[serde(default)]
    pub environment: Environment,
    /// Attestation validity in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Behavior on a dual-computation mismatch.
    #[serde(default)]
    pub mismatch_policy: MismatchPolicy,
    /// Maximum accepted request body.
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,
    /// Environment variable holding the hex signing secret.
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    /// Include the public key in every signature block.
    #[serde(default = "default_true")]
    pub expose_public_key: bool,
    /// Upper bound on one `/attest` call, which includes a full re-aggregation.
    #[serde(default = "default_notary_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum number of `/attest` calls in flight.
    #[serde(default = "default_notary_concurrency")]
    pub max_concurrency: usize,
}

fn default_notary_addr() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}
fn default_body_limit_kb() -> usize {
    64
}
fn default_private_key_env() -> String {
    "NOTARY_PRIVATE_KEY".to_string()
}
fn default_true() -> bool {
    true
}
fn default_notary_timeout_secs() -> u64 {
    120
}
fn default_notary_concurrency() -> usize {
    16
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_notary_addr(),
            environment: Environment::default(),
            ttl_secs: default_ttl_secs(),
            mismatch_policy: MismatchPolicy::default(),
            body_limit_kb: default_body_limit_kb(),
            private_key_env: default_private_key_env(),
            expose_public_key: default_true(),
            request_timeout_secs: default_notary_timeout_secs(),
            max_concurrency: default_notary_concurrency(),
        }
    }
}

/// Configuration for the revocation tracker.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrackerConfig {
    /// The chain to scan.
    #[serde(default = "default_tracker_chain")]
    pub chain_id: u64,
    /// Directory holding `revocation_state_<chain>.json`.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Upper bound on blocks covered by one scan.
    #[serde(default = "default_max_blocks")]
    pub max_blocks: u64,
    /// Seconds between scans in `run` mode.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Optional address for the `/metrics` endpoint.
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

fn default_tracker_chain() -> u64 {
    CHAIN_ETHEREUM
}
fn default_state_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_max_blocks() -> u64 {
    1_000
}
fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            chain_id: default_tracker_chain(),
            state_dir: default_state_dir(),
            max_blocks: default_max_blocks(),
            poll_interval_secs: default_poll_interval_secs(),
            metrics_addr: None,
        }
    }
}

/// Configuration for the revocation registry HTTP service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Socket address to bind.
    #[serde(default = "default_registry_addr")]
    pub listen_addr: String,
    /// Sustained requests per second per client IP.
    #[serde(default = "default_rps")]
    pub rps: u32,
    /// Burst capacity per client IP.
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// Environment variable holding the admin token for `POST /revoke`. The route is
    /// disabled when the variable is unset.
    #[serde(default = "default_admin_token_env")]
    pub admin_token_env: String,
}

fn default_registry_addr() -> String {
    "0.0.0.0:3001".to_string()
}
fn default_rps() -> u32 {
    50
}
fn default_burst() -> u32 {
    100
}
fn default_admin_token_env() -> String {
    "REGISTRY_ADMIN_TOKEN".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_registry_addr(),
            rps: default_rps(),
            burst: default_burst(),
            admin_token_env: default_admin_token_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let cfg = PlightConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.fetcher.chunk_size, 10_000);
        assert_eq!(cfg.fetcher.split_threshold, 2_000);
        assert_eq!(cfg.notary.ttl_secs, 3600);
        assert_eq!(cfg.notary.mismatch_policy, MismatchPolicy::Permissive);
        assert_eq!(cfg.tracker.max_blocks, 1_000);
        assert_eq!(cfg.chain(137).unwrap().rpc_env.as_deref(), Some("POLYGON_RPC_URL"));
    }

    #[test]
    fn test_explicit_rpc_url_wins() {
        let cfg = PlightConfig::from_toml_str(
            r#"
            [[chains]]
            chain_id = 1
            rpc_url = "http://localhost:8545"

            [notary]
            environment = "staging"
            mismatch_policy = "strict"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.rpc_url(1).unwrap(), "http://localhost:8545");
        assert_eq!(cfg.notary.environment, Environment::Staging);
        assert_eq!(cfg.notary.mismatch_policy, MismatchPolicy::Strict);
        assert_eq!(
            cfg.rpc_url(56).unwrap_err(),
            RpcError::MissingEndpoint(56)
        );
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = PlightConfig::from_toml_str("[fetcher]\nchunk_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
