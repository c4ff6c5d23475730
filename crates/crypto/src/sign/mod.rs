// Path: crates/crypto/src/sign/mod.rs
//! Signature schemes.

pub mod eddsa;
