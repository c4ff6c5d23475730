// Path: crates/revocation/src/lib.rs
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
//! # plight Revocation
//!
//! Two independent revocation mechanisms:
//!
//! - a chain-driven tracker that scans forward for disqualifying events and
//!   persists a monotonic per-chain cutoff ([`tracker`], [`store`], [`reader`]);
//! - a registry of individually revoked attestation hashes served over HTTP
//!   ([`registry`], [`server`]).

pub mod reader;
pub mod registry;
pub mod server;
pub mod store;
pub mod tracker;

pub use reader::RevocationReader;
pub use registry::RevocationRegistry;
pub use store::RevocationStore;
pub use tracker::{disqualifying_events, DisqualifyingEvent, RevocationTracker};
