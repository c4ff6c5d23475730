// Path: crates/crypto/src/algorithms/hash/mod.rs
//! Hash functions: Poseidon over the BN254 scalar field and Keccak-256.

use crate::error::CryptoError;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};
use num_bigint::BigUint;
use sha3::{Digest, Keccak256};

/// The BN254 scalar field, the native field of the attestation circuit.
pub use ark_bn254::Fr;

/// Maximum number of inputs accepted by the circom Poseidon parameter sets.
pub const MAX_POSEIDON_INPUTS: usize = 12;

/// Hashes field elements with Poseidon using the circom parameters, so the digest
/// matches `poseidon([...])` inside a circom circuit.
pub fn poseidon_hash(inputs: &[Fr]) -> Result<Fr, CryptoError> {
    if inputs.is_empty() || inputs.len() > MAX_POSEIDON_INPUTS {
        return Err(CryptoError::OperationFailed(format!(
            "poseidon supports 1..={} inputs, got {}",
            MAX_POSEIDON_INPUTS,
            inputs.len()
        )));
    }
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())
        .map_err(|e| CryptoError::OperationFailed(e.to_string()))?;
    hasher
        .hash(inputs)
        .map_err(|e| CryptoError::OperationFailed(e.to_string()))
}

/// Lifts a boolean into the field as 0 or 1.
pub fn field_from_bool(b: bool) -> Fr {
    Fr::from(u64::from(b))
}

/// The element as a non-negative integer.
pub fn field_to_biguint(f: &Fr) -> BigUint {
    BigUint::from_bytes_le(&f.into_bigint().to_bytes_le())
}

/// Reduces an integer into the field.
pub fn field_from_biguint(n: &BigUint) -> Fr {
    Fr::from_le_bytes_mod_order(&n.to_bytes_le())
}

/// The element as 32 big-endian bytes.
pub fn field_to_be_bytes(f: &Fr) -> [u8; 32] {
    biguint_to_be32(&field_to_biguint(f))
}

/// Left-pads an integer of at most 256 bits to 32 big-endian bytes.
pub fn biguint_to_be32(n: &BigUint) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (dst, src) in out.iter_mut().rev().zip(n.to_bytes_le()) {
        *dst = src;
    }
    out
}

/// The element as `0x`-prefixed, 64-character lowercase hex.
pub fn field_to_hex(f: &Fr) -> String {
    format!("0x{}", hex::encode(field_to_be_bytes(f)))
}

/// The element as a decimal string.
pub fn field_to_decimal(f: &Fr) -> String {
    field_to_biguint(f).to_str_radix(10)
}

/// Parses `0x`-prefixed hex or a decimal string of at most 32 bytes and reduces it
/// into the field.
pub fn field_from_str(s: &str) -> Result<Fr, CryptoError> {
    let value = if let Some(body) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if body.is_empty() || body.len() > 64 {
            return Err(CryptoError::InvalidFieldElement(s.to_string()));
        }
        let padded = if body.len() % 2 == 1 {
            format!("0{body}")
        } else {
            body.to_string()
        };
        let bytes =
            hex::decode(padded).map_err(|_| CryptoError::InvalidFieldElement(s.to_string()))?;
        BigUint::from_bytes_be(&bytes)
    } else {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CryptoError::InvalidFieldElement(s.to_string()));
        }
        let n = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| CryptoError::InvalidFieldElement(s.to_string()))?;
        if n.bits() > 256 {
            return Err(CryptoError::InvalidFieldElement(s.to_string()));
        }
        n
    };
    Ok(field_from_biguint(&value))
}

/// Computes Keccak-256.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// The topic0 of an EVM event: `keccak256` of its canonical signature, as `0x` hex.
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}
