// Path: crates/notary/src/circuit.rs
//! Field-element layouts shared with the attestation circuit.
//!
//! The order of elements is part of the circuit's public interface. Changing
//! it changes every hash the notary has ever signed.

use plight_crypto::algorithms::hash::{
    field_from_bool, field_from_str, field_to_hex, poseidon_hash, Fr,
};
use plight_types::aggregation::Signals;
use plight_types::attestation::AttestationEnvelope;
use plight_types::error::{AttestationError, CryptoError};

/// Number of elements in a flattened payload.
pub const PAYLOAD_WIDTH: usize = 11;
/// Number of elements in a flattened envelope.
pub const ENVELOPE_WIDTH: usize = 8;

/// Flattens signals into the circuit's payload layout. The aggregation block is
/// not part of the layout.
pub fn flatten_payload(signals: &Signals) -> [Fr; PAYLOAD_WIDTH] {
    let l = &signals.lending;
    let d = &signals.dex;
    let y = &signals.yields;
    let g = &signals.governance;
    [
        field_from_bool(l.had_borrow),
        field_from_bool(l.had_liquidation),
        Fr::from(u64::from(l.borrow_count)),
        Fr::from(u64::from(l.liquidation_count)),
        field_from_bool(d.had_swap),
        Fr::from(u64::from(d.swap_count)),
        Fr::from(u64::from(d.liquidity_add_count)),
        field_from_bool(y.had_deposit),
        Fr::from(u64::from(y.deposit_count)),
        field_from_bool(g.had_vote),
        Fr::from(u64::from(g.vote_count)),
    ]
}

/// `Poseidon(flatten_payload(signals))`.
pub fn payload_hash(signals: &Signals) -> Result<Fr, CryptoError> {
    poseidon_hash(&flatten_payload(signals))
}

/// Flattens an envelope into the circuit's envelope layout.
///
/// Fails when the envelope's payload hash or nullifier commitment is not a field
/// element in hex or decimal form.
pub fn flatten_envelope(
    envelope: &AttestationEnvelope,
) -> Result<[Fr; ENVELOPE_WIDTH], AttestationError> {
    let payload_hash = field_from_str(&envelope.aggregation.payload_hash)?;
    let nullifier = field_from_str(&envelope.subject.nullifier_commitment).map_err(|_| {
        AttestationError::InvalidInput(format!(
            "nullifier commitment '{}' is not a field element",
            envelope.subject.nullifier_commitment
        ))
    })?;
    Ok([
        Fr::from(envelope.domain.chain_id),
        Fr::from(envelope.aggregation.window_start_block),
        Fr::from(envelope.aggregation.window_end_block),
        payload_hash,
        Fr::from(envelope.time.issued_at),
        nullifier,
        field_from_bool(envelope.invariants.complete_chain_data),
        field_from_bool(envelope.invariants.adapter_execution_successful),
    ])
}

/// `Poseidon(flatten_envelope(envelope))`, the message the notary signs.
pub fn envelope_hash(envelope: &AttestationEnvelope) -> Result<Fr, AttestationError> {
    Ok(poseidon_hash(&flatten_envelope(envelope)?)?)
}

/// The envelope hash as `0x`-prefixed 32-byte hex.
pub fn envelope_hash_hex(envelope: &AttestationEnvelope) -> Result<String, AttestationError> {
    envelope_hash(envelope).map(|h| field_to_hex(&h))
}
