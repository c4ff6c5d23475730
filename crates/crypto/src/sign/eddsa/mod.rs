// Path: crates/crypto/src/sign/eddsa/mod.rs
//! EdDSA over BabyJubJub with Poseidon as the challenge hash ("eddsa-poseidon").
//!
//! The scheme follows circomlib's `EdDSAPoseidonVerifier`, so signatures verify
//! inside a circuit without any non-native arithmetic:
//!
//! * key derivation prunes the first half of `SHA-512(secret)` and shifts it right
//!   by 3 to obtain the scalar `s`; the public key is `A = Base8·s`;
//! * the nonce is `r = SHA-512(h[32..64] ‖ msg) mod l`, `R8 = Base8·r`;
//! * the challenge is `hm = Poseidon(R8.x, R8.y, A.x, A.y, msg)`;
//! * `S = r + hm·s mod l`, and a verifier checks `Base8·S == R8 + A·(8·hm)`.
//!
//! Key derivation and nonce hashing use SHA-512 rather than circomlibjs' Blake-512,
//! so a given secret yields a different key pair than circomlibjs would; verification
//! is unaffected.

pub mod babyjubjub;

use crate::algorithms::hash::{
    biguint_to_be32, field_from_str, field_to_be_bytes, field_to_biguint, field_to_decimal,
    poseidon_hash, Fr,
};
use crate::error::CryptoError;
use crate::traits::SerializableKey;
use ark_ff::PrimeField;
use babyjubjub::{base8, suborder, Point};
use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The scheme name carried in attestation responses.
pub const SCHEME: &str = "eddsa-poseidon";

/// A 32-byte signing secret. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NotaryPrivateKey([u8; 32]);

/// A BabyJubJub public key `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotaryPublicKey(Point);

/// A signature `(R8, S)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseidonSignature {
    /// The nonce commitment `R8 = Base8·r`.
    pub r8: Point,
    /// The response scalar, `S < l`.
    pub s: BigUint,
}

/// A notary signing key pair.
#[derive(Clone)]
pub struct NotaryKeyPair {
    private_key: NotaryPrivateKey,
    public_key: NotaryPublicKey,
}

impl std::fmt::Debug for NotaryPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NotaryPrivateKey(<redacted>)")
    }
}

impl std::fmt::Debug for NotaryKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotaryKeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl NotaryPrivateKey {
    /// Parses a 32-byte secret from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let body = s.trim();
        let body = body.strip_prefix("0x").unwrap_or(body);
        let bytes = Zeroizing::new(
            hex::decode(body).map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
        );
        Self::from_bytes(&bytes)
    }

    /// The secret as `0x` hex. Handle with care.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.0)))
    }

    fn expanded(&self) -> Zeroizing<[u8; 64]> {
        let digest = Sha512::digest(self.0);
        let mut out = Zeroizing::new([0u8; 64]);
        out.copy_from_slice(&digest);
        out
    }

    /// The pruned signing scalar `s`.
    fn scalar(&self) -> BigUint {
        let h = self.expanded();
        let (head, _) = h.split_at(32);
        let mut pruned = Zeroizing::new([0u8; 32]);
        pruned.copy_from_slice(head);
        pruned[0] &= 0xF8;
        pruned[31] &= 0x7F;
        pruned[31] |= 0x40;
        BigUint::from_bytes_le(pruned.as_ref()) >> 3u32
    }

    /// Derives the public key `A = Base8·s`.
    pub fn public_key(&self) -> Result<NotaryPublicKey, CryptoError> {
        Ok(NotaryPublicKey(base8().mul(&self.scalar())?))
    }

    /// Signs a field element.
    pub fn sign(&self, msg: &Fr) -> Result<PoseidonSignature, CryptoError> {
        let l = suborder();
        let h = self.expanded();
        let (_, nonce_seed) = h.split_at(32);

        let mut msg_le = field_to_be_bytes(msg);
        msg_le.reverse();
        let mut hasher = Sha512::new();
        hasher.update(nonce_seed);
        hasher.update(msg_le);
        let r = BigUint::from_bytes_le(&hasher.finalize()) % &l;

        let a = self.public_key()?;
        let r8 = base8().mul(&r)?;
        let hm = challenge(&r8, &a, msg)?;
        let s = (r + field_to_biguint(&hm) * self.scalar()) % &l;
        Ok(PoseidonSignature { r8, s })
    }
}

impl SerializableKey for NotaryPrivateKey {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }
}

fn challenge(r8: &Point, a: &NotaryPublicKey, msg: &Fr) -> Result<Fr, CryptoError> {
    poseidon_hash(&[r8.x, r8.y, a.0.x, a.0.y, *msg])
}

impl NotaryPublicKey {
    /// The underlying curve point.
    pub fn point(&self) -> &Point {
        &self.0
    }

    /// `[Ax, Ay]` as decimal strings, the form circuits take as public inputs.
    pub fn to_decimal_pair(&self) -> [String; 2] {
        [field_to_decimal(&self.0.x), field_to_decimal(&self.0.y)]
    }

    /// A short, stable identifier: the first 8 bytes of `Poseidon(Ax, Ay)` as hex.
    pub fn key_id(&self) -> Result<String, CryptoError> {
        let digest = field_to_be_bytes(&poseidon_hash(&[self.0.x, self.0.y])?);
        let prefix: Vec<u8> = digest.iter().copied().take(8).collect();
        Ok(format!("bjj-{}", hex::encode(prefix)))
    }

    /// Verifies `sig` over `msg`.
    pub fn verify(&self, msg: &Fr, sig: &PoseidonSignature) -> Result<(), CryptoError> {
        if !self.0.is_on_curve() {
            return Err(CryptoError::InvalidKey("public key is not on the curve".into()));
        }
        if !sig.r8.is_on_curve() {
            return Err(CryptoError::InvalidSignature("R8 is not on the curve".into()));
        }
        if sig.s >= suborder() {
            return Err(CryptoError::VerificationFailed);
        }
        let hm = challenge(&sig.r8, self, msg)?;
        let lhs = base8().mul(&sig.s)?;
        let rhs = sig
            .r8
            .add(&self.0.mul(&(field_to_biguint(&hm) * 8u32))?)?;
        if lhs == rhs {
            Ok(())
        } else {
            Err(CryptoError::VerificationFailed)
        }
    }
}

impl SerializableKey for NotaryPublicKey {
    /// `Ax ‖ Ay`, 32 big-endian bytes each.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(&field_to_be_bytes(&self.0.x));
        out.extend_from_slice(&field_to_be_bytes(&self.0.y));
        out
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 64 {
            return Err(CryptoError::InvalidKey(format!(
                "expected 64 bytes, got {}",
                bytes.len()
            )));
        }
        let (x, y) = bytes.split_at(32);
        let point = Point {
            x: canonical_field(x).map_err(|_| CryptoError::InvalidKey("x not canonical".into()))?,
            y: canonical_field(y).map_err(|_| CryptoError::InvalidKey("y not canonical".into()))?,
        };
        if !point.is_on_curve() {
            return Err(CryptoError::InvalidKey("public key is not on the curve".into()));
        }
        Ok(Self(point))
    }
}

/// Decodes 32 big-endian bytes, rejecting values at or above the field modulus.
fn canonical_field(bytes: &[u8]) -> Result<Fr, CryptoError> {
    let f = Fr::from_be_bytes_mod_order(bytes);
    if field_to_be_bytes(&f).as_slice() != bytes {
        return Err(CryptoError::InvalidFieldElement(hex::encode(bytes)));
    }
    Ok(f)
}

impl PoseidonSignature {
    /// The packed `0x` + R8x ‖ R8y ‖ S hex form (96 bytes).
    pub fn to_packed_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Parses the packed hex form.
    pub fn from_packed_hex(s: &str) -> Result<Self, CryptoError> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl SerializableKey for PoseidonSignature {
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(96);
        out.extend_from_slice(&field_to_be_bytes(&self.r8.x));
        out.extend_from_slice(&field_to_be_bytes(&self.r8.y));
        out.extend_from_slice(&biguint_to_be32(&self.s));
        out
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 96 {
            return Err(CryptoError::InvalidSignature(format!(
                "expected 96 bytes, got {}",
                bytes.len()
            )));
        }
        let (x, rest) = bytes.split_at(32);
        let (y, s) = rest.split_at(32);
        let r8 = Point {
            x: canonical_field(x).map_err(|e| CryptoError::InvalidSignature(e.to_string()))?,
            y: canonical_field(y).map_err(|e| CryptoError::InvalidSignature(e.to_string()))?,
        };
        Ok(Self {
            r8,
            s: BigUint::from_bytes_be(s),
        })
    }
}

impl NotaryKeyPair {
    /// Generates a fresh key pair from the OS random source.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(seed.as_mut());
        Self::from_private_key(NotaryPrivateKey::from_bytes(seed.as_ref())?)
    }

    /// Builds a key pair from an existing secret.
    pub fn from_private_key(private_key: NotaryPrivateKey) -> Result<Self, CryptoError> {
        let public_key = private_key.public_key()?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// The verification key.
    pub fn public_key(&self) -> NotaryPublicKey {
        self.public_key
    }

    /// The signing secret.
    pub fn private_key(&self) -> &NotaryPrivateKey {
        &self.private_key
    }

    /// Signs a field element.
    pub fn sign(&self, msg: &Fr) -> Result<PoseidonSignature, CryptoError> {
        self.private_key.sign(msg)
    }
}

/// Verifies a packed signature against a `0x` hex message hash and a public key
/// given as `[Ax, Ay]` decimal strings.
pub fn verify_packed(
    public_key: &[String; 2],
    msg_hex: &str,
    packed: &str,
) -> Result<(), CryptoError> {
    let [x, y] = public_key;
    let (x, y) = (field_from_str(x)?, field_from_str(y)?);
    let point = Point { x, y };
    if !point.is_on_curve() {
        return Err(CryptoError::InvalidKey("public key is not on the curve".into()));
    }
    let msg = field_from_str(msg_hex)?;
    let sig = PoseidonSignature::from_packed_hex(packed)?;
    NotaryPublicKey(point).verify(&msg, &sig)
}

#[cfg(test)]
mod tests;
