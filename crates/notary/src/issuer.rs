// Path: crates/notary/src/issuer.rs
//! Attestation issuance.
//!
//! An issuance moves through `Received → Verified → EnvelopeBuilt → Signed`, or
//! stops at `VerificationFailed`. Nothing is signed unless trusted re-execution
//! produced a payload.

use crate::circuit;
use crate::verification::{VerificationOutcome, VerificationService};
use plight_crypto::algorithms::hash::{field_from_str, field_to_hex};
use plight_crypto::sign::eddsa::{verify_packed, NotaryKeyPair, NotaryPublicKey, PoseidonSignature};
use plight_telemetry::attestation_metrics;
use plight_types::attestation::{
    AggregationBinding, AttestationEnvelope, Domain, Environment, SignerInfo, SubjectBinding,
    Validity, AGGREGATION_ENGINE_VERSION, ENVELOPE_VERSION,
};
use plight_types::codec;
use plight_types::config::{MismatchPolicy, NotaryConfig};
use plight_types::error::{AttestationError, CryptoError, ErrorCode};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of unix time, injectable for tests.
pub trait Clock: Send + Sync {
    /// Seconds since the unix epoch.
    fn now_unix(&self) -> u64;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedClock(AtomicU64);

impl FixedClock {
    /// A clock stopped at `secs`.
    pub fn new(secs: u64) -> Self {
        Self(AtomicU64::new(secs))
    }

    /// Moves the clock forward.
    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of one issuance, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceState {
    /// The request was accepted for processing.
    Received,
    /// Trusted re-execution produced a payload.
    Verified,
    /// Re-execution failed, or a strict policy rejected a mismatch.
    VerificationFailed,
    /// The envelope was built and hashed.
    EnvelopeBuilt,
    /// The envelope hash was signed.
    Signed,
}

impl fmt::Display for IssuanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Received => "received",
            Self::Verified => "verified",
            Self::VerificationFailed => "verification_failed",
            Self::EnvelopeBuilt => "envelope_built",
            Self::Signed => "signed",
        })
    }
}

/// The declared parameters of an attestation.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    /// The client's claimed aggregation output. When absent the notary attests to
    /// its own re-execution.
    pub client_payload: Option<Vec<u8>>,
    /// Chains to aggregate over.
    pub chain_ids: Vec<u64>,
    /// First block of the window.
    pub start_block: u64,
    /// Last block of the window.
    pub end_block: u64,
    /// The subject address.
    pub subject: String,
    /// Opaque commitment bound into the envelope, hex or decimal.
    pub nullifier_commitment: String,
}

/// A signed envelope plus everything a caller needs to relay it.
#[derive(Debug, Clone)]
pub struct SignedAttestation {
    /// The signed record.
    pub envelope: AttestationEnvelope,
    /// `Poseidon(flatten_envelope(envelope))` as `0x` hex.
    pub envelope_hash: String,
    /// The packed signature, `0x` + R8x ‖ R8y ‖ S.
    pub signature: String,
    /// `[Ax, Ay]` in decimal.
    pub public_key: [String; 2],
    /// The canonical trusted payload the envelope commits to.
    pub payload: String,
    /// How verification ended.
    pub outcome: VerificationOutcome,
}

/// Builds, hashes and signs attestation envelopes.
pub struct AttestationIssuer {
    verifier: VerificationService,
    keypair: Arc<NotaryKeyPair>,
    key_id: String,
    environment: Environment,
    ttl_secs: u64,
    policy: MismatchPolicy,
    clock: Arc<dyn Clock>,
}

impl AttestationIssuer {
    /// Creates an issuer using the wall clock.
    pub fn new(
        verifier: VerificationService,
        keypair: Arc<NotaryKeyPair>,
        config: &NotaryConfig,
    ) -> Result<Self, AttestationError> {
        let key_id = keypair.public_key().key_id()?;
        Ok(Self {
            verifier,
            keypair,
            key_id,
            environment: config.environment,
            ttl_secs: config.ttl_secs,
            policy: config.mismatch_policy,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The signer identifier bound into every envelope.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The verification key.
    pub fn public_key(&self) -> NotaryPublicKey {
        self.keypair.public_key()
    }

    /// The deployment environment bound into every envelope.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Verifies, builds and signs.
    pub async fn issue(&self, request: IssueRequest) -> Result<SignedAttestation, AttestationError> {
        let result = self.issue_inner(request).await;
        match &result {
            Ok(_) => attestation_metrics().inc_attestations_issued(),
            Err(e) => attestation_metrics().inc_attestation_failures(e.code()),
        }
        result
    }

    async fn issue_inner(
        &self,
        request: IssueRequest,
    ) -> Result<SignedAttestation, AttestationError> {
        log_state(IssuanceState::Received, &request.subject);
        field_from_str(&request.nullifier_commitment).map_err(|_| {
            AttestationError::InvalidInput(format!(
                "nullifier commitment '{}' is not a field element",
                request.nullifier_commitment
            ))
        })?;

        let verification = match &request.client_payload {
            Some(claim) => {
                self.verifier
                    .verify(
                        claim,
                        &request.chain_ids,
                        request.start_block,
                        request.end_block,
                        &request.subject,
                    )
                    .await
            }
            None => {
                self.verifier
                    .reexecute(
                        &request.chain_ids,
                        request.start_block,
                        request.end_block,
                        &request.subject,
                    )
                    .await
            }
        };

        let outcome = verification.outcome;
        match outcome {
            VerificationOutcome::Failed => {
                log_state(IssuanceState::VerificationFailed, &request.subject);
                return Err(AttestationError::VerificationFailed(
                    verification.error.unwrap_or_default(),
                ));
            }
            VerificationOutcome::Mismatch if self.policy == MismatchPolicy::Strict => {
                log_state(IssuanceState::VerificationFailed, &request.subject);
                return Err(AttestationError::VerificationMismatch);
            }
            VerificationOutcome::Mismatch => {
                tracing::warn!(
                    target: "notary",
                    subject = %request.subject,
                    "VerificationMismatch: attesting to the trusted payload instead of the claim"
                );
            }
            VerificationOutcome::Match | VerificationOutcome::Unclaimed => {}
        }
        let payload = verification.payload.ok_or_else(|| {
            AttestationError::VerificationFailed("re-execution produced no payload".into())
        })?;
        log_state(IssuanceState::Verified, &request.subject);

        let output = codec::parse_output(payload.as_bytes())?;
        let payload_hash = circuit::payload_hash(&output.signals)?;
        let issued_at = self.clock.now_unix();
        let envelope = AttestationEnvelope {
            version: ENVELOPE_VERSION.to_string(),
            domain: Domain {
                chain_id: output.metadata.chain_id,
                environment: self.environment,
                aggregation_engine_version: AGGREGATION_ENGINE_VERSION.to_string(),
            },
            aggregation: AggregationBinding {
                payload_hash: field_to_hex(&payload_hash),
                window_start_block: output.metadata.observation_window.start_block,
                window_end_block: output.metadata.observation_window.end_block,
            },
            subject: SubjectBinding {
                nullifier_commitment: request.nullifier_commitment,
            },
            time: Validity {
                issued_at,
                expires_at: issued_at.saturating_add(self.ttl_secs),
            },
            invariants: output.invariants,
            signer: SignerInfo {
                key_id: self.key_id.clone(),
            },
        };
        let hash = circuit::envelope_hash(&envelope)?;
        log_state(IssuanceState::EnvelopeBuilt, &request.subject);

        let signature = self.keypair.sign(&hash)?;
        log_state(IssuanceState::Signed, &request.subject);
        tracing::info!(
            target: "notary",
            chain_id = envelope.domain.chain_id,
            window_start = envelope.aggregation.window_start_block,
            window_end = envelope.aggregation.window_end_block,
            outcome = outcome.as_str(),
            "attestation issued"
        );

        Ok(SignedAttestation {
            envelope_hash: field_to_hex(&hash),
            signature: signature.to_packed_hex(),
            public_key: self.keypair.public_key().to_decimal_pair(),
            envelope,
            payload,
            outcome,
        })
    }

    /// Recomputes the envelope hash and checks the signature against this
    /// notary's key.
    pub fn verify_attestation(&self, signed: &SignedAttestation) -> Result<(), AttestationError> {
        let hash = circuit::envelope_hash(&signed.envelope)?;
        if field_to_hex(&hash) != signed.envelope_hash {
            return Err(CryptoError::VerificationFailed.into());
        }
        let sig = PoseidonSignature::from_packed_hex(&signed.signature)?;
        Ok(self.keypair.public_key().verify(&hash, &sig)?)
    }
}

/// Checks a notary signature given the public key as decimal `[Ax, Ay]`, the
/// signed hash as `0x` hex and the packed signature.
pub fn verify_signature(
    public_key: &[String; 2],
    hash_hex: &str,
    signature: &str,
) -> Result<(), CryptoError> {
    verify_packed(public_key, hash_hex, signature)
}

fn log_state(state: IssuanceState, subject: &str) {
    tracing::debug!(target: "notary", %state, subject, "issuance state");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plight_crypto::sign::eddsa::NotaryPrivateKey;
    use plight_engine::Aggregator;
    use plight_types::aggregation::{AggregationOutput, LendingSignal, Signals};
    use plight_types::error::{AggregationError, RpcError};
    use plight_types::window::BlockWindow;

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

    fn trusted() -> String {
        let mut signals = Signals::default();
        signals.lending = LendingSignal::from_counts(2, 0);
        let out = AggregationOutput::complete(1, BlockWindow::new(100, 200).unwrap(), signals);
        codec::serialize_string(&out).unwrap()
    }

    fn keypair() -> Arc<NotaryKeyPair> {
        let sk = NotaryPrivateKey::from_hex(&format!("0x{}", "11".repeat(32))).unwrap();
        Arc::new(NotaryKeyPair::from_private_key(sk).unwrap())
    }

    fn issuer(result: Result<String, AggregationError>, policy: MismatchPolicy) -> AttestationIssuer {
        let config = NotaryConfig {
            mismatch_policy: policy,
            ..NotaryConfig::default()
        };
        let verifier = VerificationService::new(Arc::new(Fixed(result)));
        AttestationIssuer::new(verifier, keypair(), &config)
            .unwrap()
            .with_clock(Arc::new(FixedClock::new(1_700_000_000)))
    }

    fn request(client_payload: Option<String>) -> IssueRequest {
        IssueRequest {
            client_payload: client_payload.map(String::into_bytes),
            chain_ids: vec![1],
            start_block: 100,
            end_block: 200,
            subject: "0x742d35cc6634c0532925a3b844bc9e7595f0beb1".into(),
            nullifier_commitment: "0x2a".into(),
        }
    }

    #[tokio::test]
    async fn test_matching_claim_is_signed_and_verifies() {
        let iss = issuer(Ok(trusted()), MismatchPolicy::Strict);
        let signed = iss.issue(request(Some(trusted()))).await.unwrap();
        assert_eq!(signed.outcome, VerificationOutcome::Match);
        assert_eq!(signed.envelope.domain.chain_id, 1);
        assert_eq!(signed.envelope.aggregation.window_start_block, 100);
        assert_eq!(signed.envelope.aggregation.window_end_block, 200);
        assert_eq!(signed.envelope.time.issued_at, 1_700_000_000);
        assert_eq!(signed.envelope.time.expires_at, 1_700_003_600);
        assert_eq!(signed.envelope.signer.key_id, iss.key_id());
        iss.verify_attestation(&signed).unwrap();
        verify_signature(&signed.public_key, &signed.envelope_hash, &signed.signature).unwrap();
    }

    #[tokio::test]
    async fn test_issuance_time_changes_hash_and_signature() {
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let iss = issuer(Ok(trusted()), MismatchPolicy::Permissive).with_clock(clock.clone());
        let a = iss.issue(request(None)).await.unwrap();
        clock.advance(1);
        let b = iss.issue(request(None)).await.unwrap();
        assert_ne!(a.envelope, b.envelope);
        assert_ne!(a.envelope_hash, b.envelope_hash);
        assert_ne!(a.signature, b.signature);
        assert_eq!(a.envelope.aggregation.payload_hash, b.envelope.aggregation.payload_hash);
    }

    #[tokio::test]
    async fn test_mismatch_policy() {
        let forged = trusted().replace("\"borrow_count\":2", "\"borrow_count\":3");
        let permissive = issuer(Ok(trusted()), MismatchPolicy::Permissive);
        let signed = permissive.issue(request(Some(forged.clone()))).await.unwrap();
        assert_eq!(signed.outcome, VerificationOutcome::Mismatch);
        // The envelope commits to the trusted payload, not the claim.
        assert_eq!(signed.payload, trusted());

        let strict = issuer(Ok(trusted()), MismatchPolicy::Strict);
        assert_eq!(
            strict.issue(request(Some(forged))).await.unwrap_err(),
            AttestationError::VerificationMismatch
        );
    }

    #[tokio::test]
    async fn test_engine_failure_is_never_signed() {
        let iss = issuer(
            Err(AggregationError::Rpc(RpcError::Transport("timeout".into()))),
            MismatchPolicy::Permissive,
        );
        let err = iss.issue(request(Some(trusted()))).await.unwrap_err();
        assert!(matches!(err, AttestationError::VerificationFailed(m) if m.contains("timeout")));
    }

    #[tokio::test]
    async fn test_rejects_bad_nullifier_commitment() {
        let iss = issuer(Ok(trusted()), MismatchPolicy::Permissive);
        let mut req = request(None);
        req.nullifier_commitment = "0xzz".into();
        assert!(matches!(
            iss.issue(req).await.unwrap_err(),
            AttestationError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_tampered_envelope_fails_verification() {
        let iss = issuer(Ok(trusted()), MismatchPolicy::Permissive);
        let mut signed = iss.issue(request(None)).await.unwrap();
        signed.envelope.aggregation.window_end_block = 201;
        assert!(iss.verify_attestation(&signed).is_err());
    }
}
