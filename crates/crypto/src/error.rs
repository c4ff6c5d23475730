// Path: crates/crypto/src/error.rs
//! Re-exports the workspace crypto error so callers need not depend on `plight-types`.

pub use plight_types::error::CryptoError;
