// Path: crates/crypto/src/key_store.rs
//! Loading and persisting the notary signing secret.
//!
//! A key file holds the 32-byte secret as a single line of `0x`-prefixed hex.
//! Files are written through a temporary sibling and renamed into place, with
//! owner-only permissions on unix.

use crate::error::CryptoError;
use crate::sign::eddsa::{NotaryKeyPair, NotaryPrivateKey};
use std::io::Write;
use std::path::Path;
use zeroize::Zeroizing;

/// Loads the key named by the environment variable `var`, if it is set and non-empty.
pub fn load_from_env(var: &str) -> Result<Option<NotaryKeyPair>, CryptoError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => {
            let raw = Zeroizing::new(raw);
            let sk = NotaryPrivateKey::from_hex(&raw)?;
            Ok(Some(NotaryKeyPair::from_private_key(sk)?))
        }
        _ => Ok(None),
    }
}

/// Loads a key file.
pub fn load_from_file(path: &Path) -> Result<NotaryKeyPair, CryptoError> {
    let raw = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
        CryptoError::InvalidKey(format!("cannot read {}: {}", path.display(), e))
    })?);
    let sk = NotaryPrivateKey::from_hex(&raw)?;
    NotaryKeyPair::from_private_key(sk)
}

/// Writes a key file atomically. Refuses to overwrite an existing file.
pub fn save_to_file(path: &Path, keypair: &NotaryKeyPair) -> Result<(), CryptoError> {
    if path.exists() {
        return Err(CryptoError::InvalidKey(format!(
            "refusing to overwrite existing key file {}",
            path.display()
        )));
    }
    let io = |e: std::io::Error| CryptoError::OperationFailed(e.to_string());
    let tmp = path.with_extension("tmp");
    {
        let mut file = open_private(&tmp).map_err(io)?;
        let hex = keypair.private_key().to_hex();
        file.write_all(hex.as_bytes()).map_err(io)?;
        file.write_all(b"\n").map_err(io)?;
        file.sync_all().map_err(io)?;
    }
    std::fs::rename(&tmp, path).map_err(io)?;
    tracing::info!(target: "crypto", path = %path.display(), "wrote notary key file");
    Ok(())
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::File::create(path)
}
