// Path: crates/notary/src/verification.rs
//! Dual computation: re-run the aggregation from the declared parameters and
//! compare the result with what the client claims.

use plight_engine::Aggregator;
use plight_telemetry::attestation_metrics;
use plight_types::codec;
use plight_types::error::SchemaError;
use serde::Serialize;
use std::sync::Arc;

/// How a verification ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The client payload equals the trusted payload after canonicalization.
    Match,
    /// The payloads differ, or the client payload is not JSON. The trusted payload
    /// is still available.
    Mismatch,
    /// No client claim was made; only the trusted payload exists.
    Unclaimed,
    /// Trusted re-execution failed.
    Failed,
}

impl VerificationOutcome {
    /// A stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Mismatch => "mismatch",
            Self::Unclaimed => "unclaimed",
            Self::Failed => "failed",
        }
    }
}

/// The answer to one verification request. Verification always answers; engine
/// errors are carried in `error` rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    /// True only when the client payload matched.
    pub verified: bool,
    /// The canonical trusted payload, when re-execution succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Why verification did not succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The detailed outcome.
    pub outcome: VerificationOutcome,
}

impl VerificationResult {
    fn failed(error: String) -> Self {
        Self {
            verified: false,
            payload: None,
            error: Some(error),
            outcome: VerificationOutcome::Failed,
        }
    }
}

/// Compares two JSON documents after canonicalizing both.
///
/// Returns `Ok(false)` on any difference in keys or values. Fails only when
/// either side is not JSON.
pub fn canonical_eq(trusted: &[u8], client: &[u8]) -> Result<bool, SchemaError> {
    Ok(codec::canonicalize(trusted)? == codec::canonicalize(client)?)
}

/// Re-executes aggregations on trusted infrastructure.
#[derive(Clone)]
pub struct VerificationService {
    aggregator: Arc<dyn Aggregator>,
}

impl VerificationService {
    /// Wraps an aggregator.
    pub fn new(aggregator: Arc<dyn Aggregator>) -> Self {
        Self { aggregator }
    }

    /// Verifies a client-claimed payload against a trusted re-execution that uses
    /// only the declared parameters.
    pub async fn verify(
        &self,
        client_payload: &[u8],
        chain_ids: &[u64],
        start_block: u64,
        end_block: u64,
        subject: &str,
    ) -> VerificationResult {
        let result = match self
            .trusted_payload(chain_ids, start_block, end_block, subject)
            .await
        {
            Err(failed) => failed,
            Ok(trusted) => match canonical_eq(trusted.as_bytes(), client_payload) {
                Ok(true) => VerificationResult {
                    verified: true,
                    payload: Some(trusted),
                    error: None,
                    outcome: VerificationOutcome::Match,
                },
                Ok(false) => {
                    tracing::warn!(
                        target: "notary",
                        ?chain_ids,
                        start_block,
                        end_block,
                        "client payload does not match trusted re-execution"
                    );
                    VerificationResult {
                        verified: false,
                        payload: Some(trusted),
                        error: Some("client payload does not match trusted re-execution".into()),
                        outcome: VerificationOutcome::Mismatch,
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "notary", error = %e, "client payload is not valid JSON");
                    VerificationResult {
                        verified: false,
                        payload: Some(trusted),
                        error: Some(format!("client payload is not valid JSON: {e}")),
                        outcome: VerificationOutcome::Mismatch,
                    }
                }
            },
        };
        attestation_metrics().inc_verifications(result.outcome.as_str());
        result
    }

    /// Runs the trusted aggregation without a client claim to compare against.
    pub async fn reexecute(
        &self,
        chain_ids: &[u64],
        start_block: u64,
        end_block: u64,
        subject: &str,
    ) -> VerificationResult {
        let result = match self
            .trusted_payload(chain_ids, start_block, end_block, subject)
            .await
        {
            Err(failed) => failed,
            Ok(trusted) => VerificationResult {
                verified: true,
                payload: Some(trusted),
                error: None,
                outcome: VerificationOutcome::Unclaimed,
            },
        };
        attestation_metrics().inc_verifications(result.outcome.as_str());
        result
    }

    async fn trusted_payload(
        &self,
        chain_ids: &[u64],
        start_block: u64,
        end_block: u64,
        subject: &str,
    ) -> Result<String, VerificationResult> {
        let raw = self
            .aggregator
            .aggregate(chain_ids, start_block, end_block, subject)
            .await
            .map_err(|e| {
                tracing::warn!(target: "notary", error = %e, "trusted re-execution failed");
                VerificationResult::failed(e.to_string())
            })?;
        let canonical = codec::canonicalize(raw.as_bytes())
            .map_err(|e| VerificationResult::failed(e.to_string()))?;
        String::from_utf8(canonical).map_err(|e| VerificationResult::failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plight_types::error::{AggregationError, RpcError};

    const TRUSTED: &str = r#"{"foo":"bar","count":123,"nested":{"a":1}}"#;

    struct Fixed(Result<String, AggregationError>);

    #[async_trait]
    impl Aggregator for Fixed {
        async fn aggregate(
            &self,
            _chain_ids: &[u64],
            _start_block: u64,
            _end_block: u64,
            _subject: &str,
        ) -> plight_types::Result<String> {
            self.0.clone()
        }
    }

    fn service() -> VerificationService {
        VerificationService::new(Arc::new(Fixed(Ok(TRUSTED.to_string()))))
    }

    async fn check(client: &str) -> VerificationResult {
        service().verify(client.as_bytes(), &[1], 100, 200, "0x00").await
    }

    #[tokio::test]
    async fn test_identical_payload_verifies() {
        let r = check(TRUSTED).await;
        assert!(r.verified);
        assert_eq!(r.outcome, VerificationOutcome::Match);
        assert_eq!(
            r.payload.as_deref(),
            Some(r#"{"count":123,"foo":"bar","nested":{"a":1}}"#)
        );
    }

    #[tokio::test]
    async fn test_formatting_differences_are_ignored() {
        let r = check("{\n  \"nested\": { \"a\": 1 },\n  \"count\": 123,\n  \"foo\": \"bar\"\n}").await;
        assert!(r.verified);
    }

    #[tokio::test]
    async fn test_value_change_is_rejected() {
        let r = check(r#"{"foo":"baz","count":123,"nested":{"a":1}}"#).await;
        assert!(!r.verified);
        assert_eq!(r.outcome, VerificationOutcome::Mismatch);
        // The trusted payload is still carried.
        assert!(r.payload.is_some());
    }

    #[tokio::test]
    async fn test_key_change_is_rejected() {
        assert!(!check(r#"{"foz":"bar","count":123,"nested":{"a":1}}"#).await.verified);
    }

    #[tokio::test]
    async fn test_missing_and_extra_fields_are_rejected() {
        assert!(!check(r#"{"foo":"bar","count":123}"#).await.verified);
        assert!(!check(r#"{"foo":"bar","count":123,"nested":{"a":1},"x":0}"#).await.verified);
        assert!(!check(r#"{"foo":"bar","count":123,"nested":{"a":2}}"#).await.verified);
    }

    #[tokio::test]
    async fn test_non_json_client_payload_is_a_mismatch() {
        let r = check("not json").await;
        assert!(!r.verified);
        assert_eq!(r.outcome, VerificationOutcome::Mismatch);
        assert!(r.error.unwrap().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn test_engine_failure_is_reported_not_raised() {
        let svc = VerificationService::new(Arc::new(Fixed(Err(AggregationError::Rpc(
            RpcError::Transport("connection refused".into()),
        )))));
        let r = svc.verify(TRUSTED.as_bytes(), &[1], 100, 200, "0x00").await;
        assert!(!r.verified);
        assert!(r.payload.is_none());
        assert_eq!(r.outcome, VerificationOutcome::Failed);
        assert!(r.error.unwrap().contains("connection refused"));

        let r = svc.reexecute(&[1], 100, 200, "0x00").await;
        assert_eq!(r.outcome, VerificationOutcome::Failed);
    }
}
