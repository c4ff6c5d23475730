// Path: crates/types/src/codec.rs

//! Defines the canonical, deterministic JSON codec for every document the pipeline hashes.
//!
//! This module provides thin wrappers around `serde_jcs` (RFC 8785 JSON Canonicalization
//! Scheme): object keys are sorted lexicographically at every nesting level and no
//! insignificant whitespace is emitted. By centralizing the codec here in the base
//! `types` crate, the engine, the verifier, and the notary all produce byte-identical
//! output for semantically identical documents, regardless of field insertion order.

use crate::aggregation::{AggregationOutput, MAX_COUNT, SCHEMA_VERSION};
use crate::attestation::{AttestationEnvelope, ENVELOPE_VERSION};
use crate::error::SchemaError;
use serde::Serialize;

/// Encodes any serializable value into canonical JSON bytes.
///
/// # Arguments
///
/// * `v` - A reference to a value that implements `serde::Serialize`.
///
/// # Returns
///
/// A `Vec<u8>` containing the RFC 8785 canonical JSON encoding.
pub fn to_canonical_json<T: Serialize + ?Sized>(v: &T) -> Result<Vec<u8>, SchemaError> {
    serde_jcs::to_vec(v).map_err(|e| SchemaError::Serialization(e.to_string()))
}

/// Parses arbitrary JSON bytes and re-emits them canonically.
///
/// This function is idempotent: `canonicalize(canonicalize(x)) == canonicalize(x)`.
/// It makes no assumption about the document's shape, which lets the verifier
/// compare a client claim against a trusted payload without first trusting the claim.
pub fn canonicalize(bytes: &[u8]) -> Result<Vec<u8>, SchemaError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    to_canonical_json(&value)
}

/// Validates an aggregation output against schema 2.1.0.
///
/// Field omission, unexpected fields and type mismatches are rejected when the
/// document is decoded (see [`parse_output`]); this function checks what the type
/// system cannot express.
pub fn validate(output: &AggregationOutput) -> Result<(), SchemaError> {
    if output.schema_version != SCHEMA_VERSION {
        return Err(SchemaError::UnsupportedVersion {
            expected: SCHEMA_VERSION,
            got: output.schema_version.clone(),
        });
    }
    let window = &output.metadata.observation_window;
    window
        .validate()
        .map_err(|e| SchemaError::Invariant(e.to_string()))?;
    let anchor = window.anchor_block();
    if output.metadata.aggregation_block != anchor {
        return Err(SchemaError::Invariant(format!(
            "aggregation_block {} must equal end_block + 1 ({})",
            output.metadata.aggregation_block, anchor
        )));
    }
    if output.commitment.issued_at_block != anchor {
        return Err(SchemaError::Invariant(format!(
            "issued_at_block {} must equal end_block + 1 ({})",
            output.commitment.issued_at_block, anchor
        )));
    }
    if !output.signals.is_consistent() {
        return Err(SchemaError::Invariant(format!(
            "had_* flags must equal count > 0 (counts are capped at {MAX_COUNT})"
        )));
    }
    Ok(())
}

/// Validates and serializes an aggregation output to canonical bytes.
pub fn serialize(output: &AggregationOutput) -> Result<Vec<u8>, SchemaError> {
    validate(output)?;
    to_canonical_json(output)
}

/// Validates and serializes an aggregation output to a canonical string.
pub fn serialize_string(output: &AggregationOutput) -> Result<String, SchemaError> {
    let bytes = serialize(output)?;
    String::from_utf8(bytes).map_err(|e| SchemaError::Serialization(e.to_string()))
}

/// Strictly decodes and validates an aggregation output.
pub fn parse_output(bytes: &[u8]) -> Result<AggregationOutput, SchemaError> {
    let output: AggregationOutput = serde_json::from_slice(bytes)?;
    validate(&output)?;
    Ok(output)
}

/// Serializes an attestation envelope to canonical bytes for archival and content addressing.
pub fn serialize_envelope(envelope: &AttestationEnvelope) -> Result<Vec<u8>, SchemaError> {
    if envelope.version != ENVELOPE_VERSION {
        return Err(SchemaError::UnsupportedVersion {
            expected: ENVELOPE_VERSION,
            got: envelope.version.clone(),
        });
    }
    to_canonical_json(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{LendingSignal, Signals};
    use crate::window::BlockWindow;
    use proptest::prelude::*;

    fn sample() -> AggregationOutput {
        let mut signals = Signals::default();
        signals.lending = LendingSignal::from_counts(3, 0);
        AggregationOutput::complete(1, BlockWindow::new(100, 200).unwrap(), signals)
    }

    #[test]
    fn test_serialize_sorts_keys_without_whitespace() {
        let bytes = serialize(&sample()).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.starts_with(r#"{"commitment":{"issued_at_block":201,"nullifier":"0xNULLIFIER"}"#));
        assert!(!s.contains(' '));
        assert!(!s.contains('\n'));
    }

    #[test]
    fn test_canonicalize_ignores_order_and_whitespace() {
        let a = br#"{"b": 1, "a": {"y": [1, 2], "x": null}}"#;
        let b = b"{\n  \"a\": {\"x\": null, \"y\": [1,2]},\n  \"b\": 1\n}";
        assert_eq!(canonicalize(a).unwrap(), canonicalize(b).unwrap());
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing_fields() {
        let mut v = serde_json::to_value(sample()).unwrap();
        v["extra"] = serde_json::json!(true);
        let err = parse_output(&serde_json::to_vec(&v).unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(_)));

        let mut v = serde_json::to_value(sample()).unwrap();
        v["signals"]["dex"].as_object_mut().unwrap().remove("swap_count");
        assert!(parse_output(&serde_json::to_vec(&v).unwrap()).is_err());

        let mut v = serde_json::to_value(sample()).unwrap();
        v["signals"]["dex"]["swap_count"] = serde_json::json!(256);
        assert!(parse_output(&serde_json::to_vec(&v).unwrap()).is_err());
    }

    #[test]
    fn test_validate_rejects_version_and_anchor_drift() {
        let mut out = sample();
        out.schema_version = "2.0.0".into();
        assert!(matches!(
            validate(&out),
            Err(SchemaError::UnsupportedVersion { .. })
        ));

        let mut out = sample();
        out.metadata.aggregation_block = 200;
        assert!(matches!(validate(&out), Err(SchemaError::Invariant(_))));

        let mut out = sample();
        out.signals.lending.had_liquidation = true;
        assert!(matches!(validate(&out), Err(SchemaError::Invariant(_))));
    }

    #[test]
    fn test_parse_round_trips_canonical_bytes() {
        let bytes = serialize(&sample()).unwrap();
        let parsed = parse_output(&bytes).unwrap();
        assert_eq!(parsed, sample());
        assert_eq!(serialize(&parsed).unwrap(), bytes);
    }

    fn json_value() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<u32>().prop_map(serde_json::Value::from),
            "[a-z]{0,6}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_canonicalize_is_idempotent(v in json_value()) {
            let pretty = serde_json::to_vec_pretty(&v).unwrap();
            let once = canonicalize(&pretty).unwrap();
            let twice = canonicalize(&once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
