// Path: crates/revocation/src/registry.rs
//! The registry of individually revoked attestation hashes.

use dashmap::DashMap;
use plight_telemetry::revocation_metrics;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Why and when a hash was revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRecord {
    /// Free-form reason; `"manual"` when none was given.
    pub reason: String,
    /// Milliseconds since the unix epoch.
    pub revoked_at_ms: u64,
}

/// Returns the lowercase form of `s` when it is `0x` followed by exactly 64 hex digits.
pub fn normalize_hash(s: &str) -> Option<String> {
    let body = s.strip_prefix("0x")?;
    (body.len() == 64 && body.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| format!("0x{}", body.to_ascii_lowercase()))
}

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// An in-memory set of revoked hashes. Lookups are case-insensitive.
#[derive(Debug, Default)]
pub struct RevocationRegistry {
    revoked: DashMap<String, RevocationRecord>,
}

impl RevocationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `hash` has been revoked. Malformed hashes are never revoked.
    pub fn is_revoked(&self, hash: &str) -> bool {
        let revoked = normalize_hash(hash).is_some_and(|h| self.revoked.contains_key(&h));
        revocation_metrics().inc_registry_lookups(revoked);
        revoked
    }

    /// The record for `hash`, if revoked.
    pub fn record(&self, hash: &str) -> Option<RevocationRecord> {
        let h = normalize_hash(hash)?;
        self.revoked.get(&h).map(|r| r.value().clone())
    }

    /// Revokes `hash`. Returns `Some(true)` when newly revoked, `Some(false)` when it
    /// already was, and `None` when the hash is malformed.
    pub fn revoke(&self, hash: &str, reason: Option<&str>) -> Option<bool> {
        let h = normalize_hash(hash)?;
        let reason = reason.filter(|r| !r.is_empty()).unwrap_or("manual");
        let mut inserted = false;
        self.revoked.entry(h.clone()).or_insert_with(|| {
            inserted = true;
            RevocationRecord {
                reason: reason.to_string(),
                revoked_at_ms: now_ms(),
            }
        });
        if inserted {
            tracing::info!(target: "registry", hash = %h, reason, "attestation revoked");
        }
        Some(inserted)
    }

    /// Number of revoked hashes.
    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    /// Whether nothing has been revoked.
    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    #[test]
    fn test_normalize_hash() {
        assert_eq!(normalize_hash(HASH).as_deref(), Some(HASH));
        assert_eq!(
            normalize_hash(&HASH.replace('1', "A")),
            Some(HASH.replace('1', "a"))
        );
        assert!(normalize_hash(&HASH[..65]).is_none());
        assert!(normalize_hash(&HASH[2..]).is_none());
        assert!(normalize_hash(&HASH.replace('1', "g")).is_none());
    }

    #[test]
    fn test_revoke_is_idempotent_and_case_insensitive() {
        let reg = RevocationRegistry::new();
        assert!(!reg.is_revoked(HASH));
        assert_eq!(reg.revoke(HASH, Some("key compromise")), Some(true));
        assert_eq!(reg.revoke(&HASH.to_uppercase().replace("0X", "0x"), None), Some(false));
        assert!(reg.is_revoked(HASH));
        assert_eq!(reg.record(HASH).unwrap().reason, "key compromise");
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.revoke("0x12", None), None);
    }
}
