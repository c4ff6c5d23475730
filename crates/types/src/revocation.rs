// Path: crates/types/src/revocation.rs
//! The persisted per-chain revocation state.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// The revocation state file format version.
pub const REVOCATION_STATE_VERSION: &str = "1.0.0";

/// A per-chain singleton recording how far the tracker has scanned and the highest
/// block at which a disqualifying event was observed. Both block fields only move forward.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RevocationState {
    /// Always [`REVOCATION_STATE_VERSION`].
    pub version: String,
    /// The chain this state belongs to.
    pub chain_id: u64,
    /// Highest block at which a disqualifying event was observed; 0 when none.
    pub revocation_cutoff_block: u64,
    /// Last block covered by a fully successful scan.
    pub last_scanned_block: u64,
    /// RFC 3339 timestamp of the scan that produced this state.
    pub produced_at: String,
}

impl RevocationState {
    /// The state implied by an absent file.
    pub fn genesis(chain_id: u64) -> Self {
        Self {
            version: REVOCATION_STATE_VERSION.to_string(),
            chain_id,
            revocation_cutoff_block: 0,
            last_scanned_block: 0,
            produced_at: now_rfc3339(),
        }
    }

    /// Returns true when an attested window ending at `window_end` extends past the
    /// revocation cutoff.
    pub fn is_window_stale(&self, window_end: u64) -> bool {
        self.revocation_cutoff_block > 0 && window_end > self.revocation_cutoff_block
    }
}

/// The current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string())
}
