// Path: crates/notary/src/server.rs
//! The notary HTTP surface: `POST /attest`, `GET /info`, `/healthz`, `/metrics`.

use crate::issuer::{AttestationIssuer, IssueRequest, SignedAttestation};
use anyhow::Result;
use axum::{
    body::Bytes,
    error_handling::HandleErrorLayer,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use plight_crypto::algorithms::hash::{field_from_str, field_to_hex, poseidon_hash};
use plight_crypto::sign::eddsa::SCHEME;
use plight_engine::matrix;
use plight_telemetry::http::{healthz_handler, metrics_handler, track_http_metrics};
use plight_types::aggregation::SCHEMA_VERSION;
use plight_types::attestation::{AttestationEnvelope, AGGREGATION_ENGINE_VERSION, ENVELOPE_VERSION};
use plight_types::config::NotaryConfig;
use plight_types::error::{AttestationError, ErrorCode};
use plight_types::protocol::Protocol;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::watch;
use tower::{
    limit::ConcurrencyLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer, BoxError,
    ServiceBuilder,
};
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// The request and response format version.
pub const API_VERSION: &str = "1.0";
/// The issuer label carried in every attestation.
pub const ISSUER: &str = "plight-notary-v1";

// --- Error Handling ---
pub enum AppError {
    BadRequest(&'static str, String),
    Attestation(AttestationError),
    Internal(anyhow::Error),
}

impl From<AttestationError> for AppError {
    fn from(e: AttestationError) -> Self {
        match e {
            AttestationError::InvalidInput(msg) => AppError::BadRequest("ATTEST_INVALID_INPUT", msg),
            other => AppError::Attestation(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg, code) = match self {
            AppError::BadRequest(code, msg) => (StatusCode::BAD_REQUEST, msg, code),
            AppError::Attestation(e) => {
                tracing::warn!(target: "notary", code = e.code(), error = %e, "attestation refused");
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string(), e.code())
            }
            AppError::Internal(e) => {
                tracing::error!(target: "notary", "Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };
        (
            status,
            Json(serde_json::json!({ "error": {"code": code, "message": msg} })),
        )
            .into_response()
    }
}

async fn map_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(serde_json::json!({
                "error": { "code": "TIMEOUT", "message": "request timed out" }
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": { "code": "OVERLOADED", "message": err.to_string() }
            })),
        )
    }
}

// --- Request/Response Types ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Window {
    pub from: u64,
    pub to: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlockRange {
    pub from_block: u64,
    pub to_block: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttestRequest {
    pub version: String,
    pub subject: String,
    pub chain_id: u64,
    pub protocol: String,
    pub window: Window,
    pub block_range: BlockRange,
    /// Hex or decimal field element. Defaults to `Poseidon(subject)`.
    #[serde(default)]
    pub nullifier_commitment: Option<String>,
    /// The client's claimed aggregation output.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub version: String,
    pub issuer: String,
    pub subject: String,
    pub issued_at: u64,
    pub expires_at: u64,
    pub chain_id: u64,
    pub protocol: String,
    pub window: Window,
    pub block_range: BlockRange,
    /// The signed envelope hash.
    pub summary_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureBlock {
    pub scheme: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub public_key: Option<[String; 2]>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttestResponse {
    pub attestation: Attestation,
    pub signature: SignatureBlock,
    pub envelope: AttestationEnvelope,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoResponse {
    public_key: [String; 2],
    key_id: String,
    scheme: &'static str,
    environment: String,
    envelope_version: &'static str,
    schema_version: &'static str,
    aggregation_engine_version: &'static str,
}

#[derive(Clone)]
struct NotaryState {
    issuer: Arc<AttestationIssuer>,
    expose_public_key: bool,
}

/// Checks the parts of a request serde cannot and derives the issuance parameters.
fn issue_request(req: &AttestRequest) -> Result<IssueRequest, AppError> {
    if req.version != API_VERSION {
        return Err(AppError::BadRequest(
            "INVALID_REQUEST",
            format!("unsupported version '{}', expected '{}'", req.version, API_VERSION),
        ));
    }
    if req.subject.len() != 42 || req.subject.parse::<plight_types::Address>().is_err() {
        return Err(AppError::BadRequest(
            "INVALID_REQUEST",
            format!("subject '{}' is not a 0x-prefixed 20-byte address", req.subject),
        ));
    }
    let protocol: Protocol = req
        .protocol
        .parse()
        .map_err(|e: plight_types::error::AggregationError| {
            AppError::BadRequest(e.code(), e.to_string())
        })?;
    if !matrix::deployed_chains(protocol).contains(&req.chain_id) {
        return Err(AppError::BadRequest(
            "AGG_UNSUPPORTED_CHAIN",
            format!("{} is not deployed on chain {}", protocol, req.chain_id),
        ));
    }
    let range = req.block_range;
    if range.from_block >= range.to_block {
        return Err(AppError::BadRequest(
            "AGG_INVALID_WINDOW",
            format!(
                "blockRange.fromBlock {} must be below toBlock {}",
                range.from_block, range.to_block
            ),
        ));
    }

    let nullifier_commitment = match &req.nullifier_commitment {
        Some(n) => n.clone(),
        None => {
            let subject = field_from_str(&req.subject)
                .map_err(|e| AppError::BadRequest("INVALID_REQUEST", e.to_string()))?;
            let digest = poseidon_hash(&[subject])
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
            field_to_hex(&digest)
        }
    };
    let client_payload = req
        .payload
        .as_ref()
        .map(serde_json::to_vec)
        .transpose()
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(IssueRequest {
        client_payload,
        chain_ids: vec![req.chain_id],
        start_block: range.from_block,
        end_block: range.to_block,
        subject: req.subject.to_ascii_lowercase(),
        nullifier_commitment,
    })
}

fn into_response(req: AttestRequest, signed: SignedAttestation, expose_key: bool) -> AttestResponse {
    AttestResponse {
        attestation: Attestation {
            version: API_VERSION.to_string(),
            issuer: ISSUER.to_string(),
            subject: req.subject,
            issued_at: signed.envelope.time.issued_at,
            expires_at: signed.envelope.time.expires_at,
            chain_id: req.chain_id,
            protocol: req.protocol,
            window: req.window,
            block_range: req.block_range,
            summary_hash: signed.envelope_hash,
        },
        signature: SignatureBlock {
            scheme: SCHEME.to_string(),
            value: signed.signature,
            public_key: expose_key.then_some(signed.public_key),
        },
        envelope: signed.envelope,
    }
}

// --- Handlers ---
async fn attest_handler(
    State(state): State<NotaryState>,
    body: Bytes,
) -> Result<Json<AttestResponse>, AppError> {
    let req: AttestRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest("INVALID_SCHEMA", e.to_string()))?;
    let issue = issue_request(&req)?;
    tracing::debug!(
        target: "notary",
        chain_id = req.chain_id,
        protocol = %req.protocol,
        from_block = req.block_range.from_block,
        to_block = req.block_range.to_block,
        claimed = issue.client_payload.is_some(),
        "attest request"
    );
    let signed = state.issuer.issue(issue).await?;
    Ok(Json(into_response(req, signed, state.expose_public_key)))
}

async fn info_handler(State(state): State<NotaryState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        public_key: state.issuer.public_key().to_decimal_pair(),
        key_id: state.issuer.key_id().to_string(),
        scheme: SCHEME,
        environment: state.issuer.environment().to_string(),
        envelope_version: ENVELOPE_VERSION,
        schema_version: SCHEMA_VERSION,
        aggregation_engine_version: AGGREGATION_ENGINE_VERSION,
    })
}

// --- Server ---
/// Builds the notary router with its middleware stack.
pub fn router(issuer: Arc<AttestationIssuer>, config: &NotaryConfig) -> Router {
    let state = NotaryState {
        issuer,
        expose_public_key: config.expose_public_key,
    };
    Router::new()
        .route("/attest", post(attest_handler))
        .route("/info", get(info_handler))
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(track_http_metrics))
        .with_state(state)
        // `HandleErrorLayer` must wrap the fallible layers to make the service infallible.
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(map_middleware_error))
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(config.max_concurrency))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                ))),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.body_limit_kb * 1024))
}

/// Serves the notary until `shutdown_rx` changes.
pub async fn run_server(
    config: NotaryConfig,
    issuer: Arc<AttestationIssuer>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let app = router(issuer.clone(), &config);
    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        target: "notary",
        addr = %listener.local_addr()?,
        key_id = issuer.key_id(),
        environment = %config.environment,
        policy = ?config.mismatch_policy,
        "notary listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_rx.changed().await.ok();
        tracing::info!(target: "notary", "shutting down gracefully");
    })
    .await?;
    Ok(())
}
