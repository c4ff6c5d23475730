// Path: crates/types/src/error/mod.rs
//! Core error types for the plight trust pipeline.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors raised while talking to a JSON-RPC provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The provider rejected the query because the range or the response was too large.
    #[error("RPC limit exceeded: {0}")]
    Limit(String),
    /// The request never produced a JSON-RPC response (connection, timeout, HTTP status).
    #[error("RPC transport error: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error outside the limit class.
    #[error("RPC node error {code}: {message}")]
    Node {
        /// The JSON-RPC error code.
        code: i64,
        /// The message returned by the node.
        message: String,
    },
    /// The response could not be decoded.
    #[error("RPC decode error: {0}")]
    Decode(String),
    /// Adaptive range splitting reached its depth bound without success.
    #[error("RPC range [{from}, {to}] exhausted the split budget: {reason}")]
    SplitExhausted {
        /// First block of the range that could not be fetched.
        from: u64,
        /// Last block of the range that could not be fetched.
        to: u64,
        /// The last error observed for the range.
        reason: String,
    },
    /// No RPC endpoint is configured for the chain.
    #[error("No RPC endpoint configured for chain {0}")]
    MissingEndpoint(u64),
}

impl ErrorCode for RpcError {
    fn code(&self) -> &'static str {
        match self {
            Self::Limit(_) => "RPC_LIMIT",
            Self::Transport(_) => "RPC_TRANSPORT",
            Self::Node { .. } => "RPC_NODE_ERROR",
            Self::Decode(_) => "RPC_DECODE_ERROR",
            Self::SplitExhausted { .. } => "RPC_SPLIT_EXHAUSTED",
            Self::MissingEndpoint(_) => "RPC_MISSING_ENDPOINT",
        }
    }
}

/// Errors raised when a document does not match its versioned schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The document is not valid JSON, or a field is missing, unexpected, or mistyped.
    #[error("Malformed document: {0}")]
    Malformed(String),
    /// The document declares a version this build does not produce.
    #[error("Unsupported schema version: expected {expected}, got {got}")]
    UnsupportedVersion {
        /// The version this build understands.
        expected: &'static str,
        /// The version found in the document.
        got: String,
    },
    /// The document parsed but violates a cross-field invariant.
    #[error("Schema invariant violated: {0}")]
    Invariant(String),
    /// Canonical serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl ErrorCode for SchemaError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "SCHEMA_MALFORMED",
            Self::UnsupportedVersion { .. } => "SCHEMA_UNSUPPORTED_VERSION",
            Self::Invariant(_) => "SCHEMA_INVARIANT_VIOLATED",
            Self::Serialization(_) => "SCHEMA_SERIALIZATION_FAILED",
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(e: serde_json::Error) -> Self {
        SchemaError::Malformed(e.to_string())
    }
}

/// Errors that abort an aggregation run. No partial output is ever produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    /// The block window is empty or inverted.
    #[error("Invalid block window: start {start} must be below end {end}")]
    InvalidWindow {
        /// The requested start block.
        start: u64,
        /// The requested end block.
        end: u64,
    },
    /// The request did not name any chain.
    #[error("At least one chain id is required")]
    NoChains,
    /// The chain is not part of the static chain/protocol matrix.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(u64),
    /// The protocol is unknown, or has no deployment for the requested chain or contract.
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),
    /// An address string could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// A log query failed irrecoverably.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The produced document failed its own schema check.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ErrorCode for AggregationError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidWindow { .. } => "AGG_INVALID_WINDOW",
            Self::NoChains => "AGG_NO_CHAINS",
            Self::UnsupportedChain(_) => "AGG_UNSUPPORTED_CHAIN",
            Self::UnsupportedProtocol(_) => "AGG_UNSUPPORTED_PROTOCOL",
            Self::InvalidAddress(_) => "AGG_INVALID_ADDRESS",
            Self::Rpc(e) => e.code(),
            Self::Schema(e) => e.code(),
        }
    }
}

/// Errors from cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The signature failed cryptographic verification.
    #[error("Signature verification failed")]
    VerificationFailed,
    /// The provided key material is malformed.
    #[error("Invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// The provided signature material is malformed.
    #[error("Invalid signature format: {0}")]
    InvalidSignature(String),
    /// A value could not be represented as a field element.
    #[error("Invalid field element: {0}")]
    InvalidFieldElement(String),
    /// A generic failure in an underlying cryptographic library.
    #[error("Cryptographic operation failed: {0}")]
    OperationFailed(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
            Self::InvalidFieldElement(_) => "CRYPTO_INVALID_FIELD_ELEMENT",
            Self::OperationFailed(_) => "CRYPTO_OPERATION_FAILED",
        }
    }
}

/// Errors raised by the attestation issuer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttestationError {
    /// Trusted re-execution failed; nothing was signed.
    #[error("Verification failed: {0}")]
    VerificationFailed(String),
    /// The client payload did not match the trusted re-execution under a strict policy.
    #[error("Client payload does not match trusted re-execution")]
    VerificationMismatch,
    /// The request parameters are invalid.
    #[error("Invalid attestation input: {0}")]
    InvalidInput(String),
    /// Hashing or signing failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The envelope or payload violated its schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ErrorCode for AttestationError {
    fn code(&self) -> &'static str {
        match self {
            Self::VerificationFailed(_) => "ATTEST_VERIFICATION_FAILED",
            Self::VerificationMismatch => "ATTEST_VERIFICATION_MISMATCH",
            Self::InvalidInput(_) => "ATTEST_INVALID_INPUT",
            Self::Crypto(e) => e.code(),
            Self::Schema(e) => e.code(),
        }
    }
}

/// Errors from the revocation state store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the state file failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The state file exists but cannot be decoded.
    #[error("Corrupt revocation state at {path}: {reason}")]
    Corrupt {
        /// The offending file.
        path: String,
        /// Why decoding failed.
        reason: String,
    },
    /// The state file belongs to a different chain.
    #[error("Revocation state chain mismatch: expected {expected}, found {found}")]
    ChainMismatch {
        /// The chain the store was opened for.
        expected: u64,
        /// The chain recorded in the file.
        found: u64,
    },
    /// A save attempted to move a monotonic field backwards.
    #[error("CRITICAL: {field} regression detected (on disk {previous}, attempted {attempted})")]
    MonotonicityViolation {
        /// The regressing field.
        field: &'static str,
        /// The value already persisted.
        previous: u64,
        /// The lower value that was rejected.
        attempted: u64,
    },
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "STORE_IO_ERROR",
            Self::Corrupt { .. } => "STORE_CORRUPT",
            Self::ChainMismatch { .. } => "STORE_CHAIN_MISMATCH",
            Self::MonotonicityViolation { .. } => "STORE_MONOTONICITY_VIOLATION",
        }
    }
}

/// Errors raised by a revocation scan.
#[derive(Error, Debug)]
pub enum RevocationError {
    /// The state store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An event-source query failed; nothing was persisted.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The tracker configuration is unusable.
    #[error("Revocation configuration error: {0}")]
    Config(String),
}

impl RevocationError {
    /// Returns true when the error signals a data-integrity emergency that must stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::MonotonicityViolation { .. })
                | Self::Store(StoreError::Corrupt { .. })
                | Self::Store(StoreError::ChainMismatch { .. })
        )
    }
}

impl ErrorCode for RevocationError {
    fn code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.code(),
            Self::Rpc(e) => e.code(),
            Self::Config(_) => "REVOCATION_CONFIG_ERROR",
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// The file that was read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for the expected shape.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is present but invalid.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "CONFIG_READ_ERROR",
            Self::Parse(_) => "CONFIG_PARSE_ERROR",
            Self::Invalid(_) => "CONFIG_INVALID",
        }
    }
}
