// Path: crates/revocation/src/store.rs
//! Durable, per-chain revocation state.
//!
//! One file per chain, `revocation_state_<chain>.json`, holding canonical JSON.
//! Writes go to a sibling temp file that is fsynced and renamed over the target,
//! so readers observe either the old or the new state and never a torn one.

use parking_lot::Mutex;
use plight_telemetry::revocation_metrics;
use plight_types::codec;
use plight_types::error::StoreError;
use plight_types::revocation::{RevocationState, REVOCATION_STATE_VERSION};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// The file-backed revocation state store.
#[derive(Debug)]
pub struct RevocationStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl RevocationStore {
    /// Opens (and creates, if needed) the state directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// The directory holding the state files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The state file for `chain_id`.
    pub fn path_for(&self, chain_id: u64) -> PathBuf {
        self.dir.join(format!("revocation_state_{chain_id}.json"))
    }

    /// Loads the state for `chain_id`. An absent file is genesis; an unreadable or
    /// foreign one is an error.
    pub fn load(&self, chain_id: u64) -> Result<RevocationState, StoreError> {
        let path = self.path_for(chain_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(RevocationState::genesis(chain_id))
            }
            Err(e) => return Err(e.into()),
        };
        let corrupt = |reason: String| StoreError::Corrupt {
            path: path.display().to_string(),
            reason,
        };
        let state: RevocationState =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
        if state.version != REVOCATION_STATE_VERSION {
            return Err(corrupt(format!("unsupported version '{}'", state.version)));
        }
        if state.chain_id != chain_id {
            return Err(StoreError::ChainMismatch {
                expected: chain_id,
                found: state.chain_id,
            });
        }
        Ok(state)
    }

    /// Persists `state`, refusing to move either block field backwards relative to
    /// what is on disk.
    pub fn save(&self, state: &RevocationState) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let previous = self.load(state.chain_id)?;
        if state.revocation_cutoff_block < previous.revocation_cutoff_block {
            return Err(StoreError::MonotonicityViolation {
                field: "revocation_cutoff_block",
                previous: previous.revocation_cutoff_block,
                attempted: state.revocation_cutoff_block,
            });
        }
        if state.last_scanned_block < previous.last_scanned_block {
            return Err(StoreError::MonotonicityViolation {
                field: "last_scanned_block",
                previous: previous.last_scanned_block,
                attempted: state.last_scanned_block,
            });
        }

        let bytes = codec::to_canonical_json(state)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        let path = self.path_for(state.chain_id);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        sync_dir(&self.dir);

        let metrics = revocation_metrics();
        metrics.set_cutoff_block(state.chain_id, state.revocation_cutoff_block);
        metrics.set_last_scanned_block(state.chain_id, state.last_scanned_block);
        tracing::debug!(
            target: "revocation",
            chain_id = state.chain_id,
            cutoff = state.revocation_cutoff_block,
            last_scanned = state.last_scanned_block,
            "revocation state persisted"
        );
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::warn!(target: "revocation", error = %e, "failed to fsync state directory");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn state(chain_id: u64, cutoff: u64, scanned: u64) -> RevocationState {
        RevocationState {
            revocation_cutoff_block: cutoff,
            last_scanned_block: scanned,
            ..RevocationState::genesis(chain_id)
        }
    }

    #[test]
    fn test_absent_file_is_genesis() {
        let dir = tempdir().unwrap();
        let store = RevocationStore::open(dir.path()).unwrap();
        let s = store.load(1).unwrap();
        assert_eq!(s.revocation_cutoff_block, 0);
        assert_eq!(s.last_scanned_block, 0);
        assert_eq!(s.chain_id, 1);
    }

    #[test]
    fn test_save_writes_canonical_json_per_chain() {
        let dir = tempdir().unwrap();
        let store = RevocationStore::open(dir.path()).unwrap();
        store.save(&state(1, 10, 20)).unwrap();
        store.save(&state(137, 5, 6)).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("revocation_state_1.json")).unwrap();
        assert!(raw.starts_with(r#"{"chain_id":1,"last_scanned_block":20,"produced_at":"#));
        assert!(!raw.contains('\n'));
        assert_eq!(store.load(137).unwrap().last_scanned_block, 6);
        assert!(!dir.path().join("revocation_state_1.json.tmp").exists());
    }

    #[test]
    fn test_regressions_are_rejected() {
        let dir = tempdir().unwrap();
        let store = RevocationStore::open(dir.path()).unwrap();
        store.save(&state(1, 10, 20)).unwrap();

        let err = store.save(&state(1, 9, 30)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::MonotonicityViolation {
                field: "revocation_cutoff_block",
                previous: 10,
                attempted: 9
            }
        ));
        let err = store.save(&state(1, 10, 19)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::MonotonicityViolation {
                field: "last_scanned_block",
                ..
            }
        ));
        // Equal values are not a regression.
        store.save(&state(1, 10, 20)).unwrap();
        assert_eq!(store.load(1).unwrap().last_scanned_block, 20);
    }

    #[test]
    fn test_corrupt_and_foreign_files_fail_closed() {
        let dir = tempdir().unwrap();
        let store = RevocationStore::open(dir.path()).unwrap();
        std::fs::write(store.path_for(1), b"{not json").unwrap();
        assert!(matches!(store.load(1), Err(StoreError::Corrupt { .. })));
        // A corrupt file also blocks saves instead of being overwritten.
        assert!(store.save(&state(1, 1, 1)).is_err());

        let foreign = serde_json::to_vec(&state(10, 0, 0)).unwrap();
        std::fs::write(store.path_for(1), foreign).unwrap();
        assert!(matches!(
            store.load(1),
            Err(StoreError::ChainMismatch {
                expected: 1,
                found: 10
            })
        ));
    }
}
