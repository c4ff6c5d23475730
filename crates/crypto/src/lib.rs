// Path: crates/crypto/src/lib.rs
//! # plight Crypto Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # plight Cryptography
//!
//! Field-native primitives for attestations: Poseidon over the BN254 scalar field,
//! EdDSA-Poseidon over BabyJubJub, plus Keccak-256 for EVM event topics.

pub mod algorithms;
pub mod error;
pub mod key_store;
pub mod sign;
pub mod traits;

pub use algorithms::hash::{keccak256, poseidon_hash, Fr};
pub use sign::eddsa::{NotaryKeyPair, NotaryPrivateKey, NotaryPublicKey, PoseidonSignature};

