// Path: crates/types/src/attestation.rs
//! The attestation envelope: the exact preimage of the notary's signed hash.

use crate::aggregation::Invariants;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The envelope format version.
pub const ENVELOPE_VERSION: &str = "1.0.0";
/// The aggregation engine version bound into every envelope.
pub const AGGREGATION_ENGINE_VERSION: &str = "2.1.0";
/// Default validity of an attestation, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// The deployment environment the notary runs in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production deployment.
    Production,
    /// Staging deployment.
    Staging,
    /// Local development.
    #[default]
    Development,
}

impl Environment {
    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Where and by which engine the attestation was produced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Domain {
    /// The chain the attestation is scoped to.
    pub chain_id: u64,
    /// The notary's deployment environment.
    pub environment: Environment,
    /// The engine version that produced the verified payload.
    pub aggregation_engine_version: String,
}

/// Binds the verified payload commitment to its observation window.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AggregationBinding {
    /// Poseidon commitment over the flattened signals, `0x`-prefixed 32-byte hex.
    pub payload_hash: String,
    /// First observed block.
    pub window_start_block: u64,
    /// Last observed block.
    pub window_end_block: u64,
}

/// The opaque subject commitment supplied by the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SubjectBinding {
    /// A caller-chosen nullifier commitment. The notary never binds a raw address here.
    pub nullifier_commitment: String,
}

/// Issuance and expiry, in unix seconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Validity {
    /// When the envelope was built.
    pub issued_at: u64,
    /// `issued_at + ttl`.
    pub expires_at: u64,
}

/// Identifies the signing key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SignerInfo {
    /// A short identifier derived from the notary public key.
    pub key_id: String,
}

/// The structured record binding a verified aggregation to a window, a subject
/// commitment, and a validity period. Immutable once built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AttestationEnvelope {
    /// Always [`ENVELOPE_VERSION`].
    pub version: String,
    /// Chain, environment and engine version.
    pub domain: Domain,
    /// Payload commitment and window.
    pub aggregation: AggregationBinding,
    /// Subject commitment.
    pub subject: SubjectBinding,
    /// Issuance and expiry.
    pub time: Validity,
    /// Invariants copied from the verified payload.
    pub invariants: Invariants,
    /// Signing key identifier.
    pub signer: SignerInfo,
}
