// Path: crates/crypto/src/algorithms/mod.rs
//! Hash functions.

pub mod hash;
