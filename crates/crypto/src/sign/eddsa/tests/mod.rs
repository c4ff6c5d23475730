// Path: crates/crypto/src/sign/eddsa/tests/mod.rs
use super::*;
use crate::algorithms::hash::{field_to_hex, Fr};

#[test]
fn test_keypair_generation() {
    let keypair = NotaryKeyPair::generate().unwrap();
    let message = Fr::from(42u64);

    // Sign
    let signature = keypair.sign(&message).unwrap();

    // Verify
    let public_key = keypair.public_key();
    assert!(public_key.verify(&message, &signature).is_ok());
    assert!(public_key.point().is_on_curve());
}

#[test]
fn test_signatures_are_deterministic() {
    let sk = NotaryPrivateKey::from_bytes(&[7u8; 32]).unwrap();
    let keypair = NotaryKeyPair::from_private_key(sk).unwrap();
    let msg = Fr::from(1234u64);
    assert_eq!(keypair.sign(&msg).unwrap(), keypair.sign(&msg).unwrap());
    assert_ne!(
        keypair.sign(&msg).unwrap(),
        keypair.sign(&Fr::from(1235u64)).unwrap()
    );
}

#[test]
fn test_wrong_message_or_key_fails() {
    let keypair = NotaryKeyPair::generate().unwrap();
    let other = NotaryKeyPair::generate().unwrap();
    let msg = Fr::from(99u64);
    let sig = keypair.sign(&msg).unwrap();

    assert_eq!(
        keypair.public_key().verify(&Fr::from(100u64), &sig),
        Err(CryptoError::VerificationFailed)
    );
    assert_eq!(
        other.public_key().verify(&msg, &sig),
        Err(CryptoError::VerificationFailed)
    );
}

#[test]
fn test_tampered_s_fails() {
    let keypair = NotaryKeyPair::generate().unwrap();
    let msg = Fr::from(5u64);
    let mut sig = keypair.sign(&msg).unwrap();
    sig.s += 1u32;
    assert!(keypair.public_key().verify(&msg, &sig).is_err());

    // S at or above the subgroup order is malleable and always rejected.
    let mut sig = keypair.sign(&msg).unwrap();
    sig.s += suborder();
    assert_eq!(
        keypair.public_key().verify(&msg, &sig),
        Err(CryptoError::VerificationFailed)
    );
}

#[test]
fn test_serialization_roundtrip() {
    let keypair = NotaryKeyPair::generate().unwrap();

    let public_bytes = keypair.public_key().to_bytes();
    let private_bytes = keypair.private_key().to_bytes();
    assert_eq!(public_bytes.len(), 64);
    assert_eq!(private_bytes.len(), 32);

    let public_key = NotaryPublicKey::from_bytes(&public_bytes).unwrap();
    let private_key = NotaryPrivateKey::from_bytes(&private_bytes).unwrap();
    assert_eq!(public_key, private_key.public_key().unwrap());

    let hex = keypair.private_key().to_hex();
    let reloaded = NotaryPrivateKey::from_hex(&hex).unwrap();
    assert_eq!(reloaded.public_key().unwrap(), keypair.public_key());
}

#[test]
fn test_packed_signature_layout() {
    let keypair = NotaryKeyPair::generate().unwrap();
    let msg = Fr::from(77u64);
    let sig = keypair.sign(&msg).unwrap();
    let packed = sig.to_packed_hex();
    assert!(packed.starts_with("0x"));
    assert_eq!(packed.len(), 2 + 96 * 2);
    assert_eq!(PoseidonSignature::from_packed_hex(&packed).unwrap(), sig);

    let pk = keypair.public_key().to_decimal_pair();
    assert!(verify_packed(&pk, &field_to_hex(&msg), &packed).is_ok());
    assert!(verify_packed(&pk, &field_to_hex(&Fr::from(78u64)), &packed).is_err());
}

#[test]
fn test_rejects_malformed_material() {
    assert!(NotaryPrivateKey::from_bytes(&[0u8; 31]).is_err());
    assert!(NotaryPrivateKey::from_hex("0xnothex").is_err());
    assert!(NotaryPublicKey::from_bytes(&[1u8; 64]).is_err());
    assert!(PoseidonSignature::from_bytes(&[0u8; 95]).is_err());
}

#[test]
fn test_key_id_is_stable() {
    let sk = NotaryPrivateKey::from_bytes(&[9u8; 32]).unwrap();
    let a = sk.public_key().unwrap().key_id().unwrap();
    let b = sk.public_key().unwrap().key_id().unwrap();
    assert_eq!(a, b);
    assert!(a.starts_with("bjj-"));
    assert_eq!(a.len(), 4 + 16);
}
