// Path: crates/revocation/src/reader.rs
//! Read-only access to revocation state for signers and relying parties.
//!
//! The reader reports facts and enforces nothing. A state file that cannot be
//! read is an error, never a silent genesis.

use crate::store::RevocationStore;
use plight_types::error::StoreError;
use plight_types::revocation::RevocationState;
use std::sync::Arc;

/// Read-only view over a [`RevocationStore`].
#[derive(Debug, Clone)]
pub struct RevocationReader {
    store: Arc<RevocationStore>,
}

impl RevocationReader {
    /// Wraps a store.
    pub fn new(store: Arc<RevocationStore>) -> Self {
        Self { store }
    }

    /// The current state for `chain_id`.
    pub fn state(&self, chain_id: u64) -> Result<RevocationState, StoreError> {
        self.store.load(chain_id)
    }

    /// Whether an attested window ending at `window_end` on `chain_id` extends past
    /// the latest disqualifying event.
    pub fn is_window_stale(&self, chain_id: u64, window_end: u64) -> Result<bool, StoreError> {
        Ok(self.state(chain_id)?.is_window_stale(window_end))
    }
}
