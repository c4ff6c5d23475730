// Path: crates/notary/src/lib.rs
#![forbid(unsafe_code)]
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
//! # plight Notary
//!
//! The notary turns a client claim into a signed attestation only after an
//! independent re-execution of the aggregation agrees with (or, under the
//! permissive policy, replaces) that claim.
//!
//! - [`verification`]: dual computation and canonical comparison.
//! - [`circuit`]: flattening of signals and envelopes into field elements.
//! - [`issuer`]: envelope construction, Poseidon hashing and EdDSA signing.
//! - [`server`]: the `POST /attest` HTTP surface.

pub mod circuit;
pub mod issuer;
pub mod server;
pub mod verification;

pub use issuer::{AttestationIssuer, Clock, IssueRequest, SignedAttestation, SystemClock};
pub use verification::{VerificationOutcome, VerificationResult, VerificationService};
