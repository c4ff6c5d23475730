// Path: crates/crypto/src/traits.rs
//! Unified traits for key and signature encodings.

use crate::error::CryptoError;

/// A trait for any key or signature that can be serialized to and from bytes.
pub trait SerializableKey {
    /// Converts the value to a byte vector.
    fn to_bytes(&self) -> Vec<u8>;

    /// Creates the value from a byte slice.
    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError>
    where
        Self: Sized;
}
