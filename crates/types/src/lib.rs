// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # plight Types
//!
//! This crate is the foundational library for the plight trust pipeline, containing
//! the aggregation output model, the attestation envelope, the revocation state
//! record, error types, and configuration objects.
//!
//! ## Architectural Role
//!
//! Every other crate in the workspace depends on `plight-types`. Keeping the
//! document shapes here gives the engine, the notary and the revocation tracker a
//! single, canonical definition of the bytes they exchange and hash.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::AggregationError> = std::result::Result<T, E>;

/// The 20-byte account address newtype and its topic encoding.
pub mod address;
/// The aggregation output document and its per-primitive signals.
pub mod aggregation;
/// The attestation envelope signed by the notary.
pub mod attestation;
/// Canonical JSON serialization and schema validation.
pub mod codec;
/// Shared configuration structures (chains, notary, tracker, registry).
pub mod config;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Protocols, behavioral primitives, and supported chain identifiers.
pub mod protocol;
/// The persisted per-chain revocation state record.
pub mod revocation;
/// The observation block window.
pub mod window;

pub use address::Address;
pub use aggregation::{AggregationOutput, Signals};
pub use attestation::AttestationEnvelope;
pub use revocation::RevocationState;
pub use window::BlockWindow;
