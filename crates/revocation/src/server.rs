// Path: crates/revocation/src/server.rs
//! The registry HTTP surface: `GET /revoked`, admin `POST /revoke`, `/healthz`, `/metrics`.

use crate::registry::{normalize_hash, now_ms, RevocationRegistry};
use anyhow::Result;
use axum::{
    body::{Body, Bytes},
    error_handling::HandleErrorLayer,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use plight_telemetry::http::{healthz_handler, metrics_handler, track_http_metrics};
use plight_types::config::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::watch;
use tower::{
    limit::ConcurrencyLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer, BoxError,
    ServiceBuilder,
};
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// The header carrying the admin token on `POST /revoke`.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

// --- Error Handling ---
pub enum AppError {
    BadRequest(String),
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg, code) = match self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, s, "INVALID_REQUEST"),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or invalid admin token".to_string(),
                "UNAUTHORIZED",
            ),
        };
        (
            status,
            Json(serde_json::json!({ "error": {"code": code, "message": msg} })),
        )
            .into_response()
    }
}

// --- Rate Limiter ---
#[derive(Clone)]
struct IpLimiter {
    buckets: Arc<DashMap<IpAddr, Bucket>>,
    rps: f64,
    burst: f64,
}
#[derive(Clone)]
struct Bucket {
    tokens: f64,
    last: Instant,
}
impl IpLimiter {
    fn new(rps: u32, burst: u32) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            rps: f64::from(rps),
            burst: f64::from(burst),
        }
    }
    fn client_ip<B>(&self, req: &Request<B>) -> IpAddr {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|c| c.0.ip())
            .unwrap_or(IpAddr::from([127, 0, 0, 1]))
    }
    fn allow<B>(&self, req: &Request<B>) -> bool {
        let ip = self.client_ip(req);
        let now = Instant::now();
        let mut entry = self.buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.burst,
            last: now,
        });
        let elapsed = now.duration_since(entry.last).as_secs_f64();
        entry.tokens = (entry.tokens + elapsed * self.rps).min(self.burst);
        entry.last = now;
        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
async fn rate_limit_middleware(
    State(limiter): State<IpLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if limiter.allow(&req) {
        next.run(req).await
    } else {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": { "code": "RATE_LIMITED", "message": "Too many requests" }
            })),
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
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevokedQuery {
    attestation_hash: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RevokedResponse {
    pub revoked: bool,
    pub attestation_hash: String,
    /// Milliseconds since the unix epoch.
    pub timestamp: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RevokeRequest {
    attestation_hash: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub revoked: bool,
    pub newly_revoked: bool,
    pub attestation_hash: String,
}

#[derive(Clone)]
struct RegistryState {
    registry: Arc<RevocationRegistry>,
    admin_token: Option<Arc<str>>,
}

// --- Handlers ---
async fn revoked_handler(
    State(state): State<RegistryState>,
    Query(query): Query<RevokedQuery>,
) -> Result<Json<RevokedResponse>, AppError> {
    let raw = query
        .attestation_hash
        .ok_or_else(|| AppError::BadRequest("attestationHash is required".into()))?;
    if normalize_hash(&raw).is_none() {
        return Err(AppError::BadRequest(
            "attestationHash must be 0x followed by 64 hex characters".into(),
        ));
    }
    Ok(Json(RevokedResponse {
        revoked: state.registry.is_revoked(&raw),
        attestation_hash: raw,
        timestamp: now_ms(),
    }))
}

async fn revoke_handler(
    State(state): State<RegistryState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RevokeResponse>, AppError> {
    let expected = state.admin_token.as_deref().ok_or(AppError::Unauthorized)?;
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        tracing::warn!(target: "registry", "rejected revoke with bad admin token");
        return Err(AppError::Unauthorized);
    }
    let req: RevokeRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let newly_revoked = state
        .registry
        .revoke(&req.attestation_hash, req.reason.as_deref())
        .ok_or_else(|| {
            AppError::BadRequest("attestationHash must be 0x followed by 64 hex characters".into())
        })?;
    Ok(Json(RevokeResponse {
        revoked: true,
        newly_revoked,
        attestation_hash: req.attestation_hash,
    }))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// --- Server ---
/// Builds the registry router. `POST /revoke` is only mounted when an admin token
/// is given.
pub fn router(
    registry: Arc<RevocationRegistry>,
    config: &RegistryConfig,
    admin_token: Option<String>,
) -> Router {
    let limiter = IpLimiter::new(config.rps, config.burst);
    let admin_token: Option<Arc<str>> = admin_token.filter(|t| !t.is_empty()).map(Into::into);
    let mut app = Router::new()
        .route("/revoked", get(revoked_handler))
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler));
    if admin_token.is_some() {
        app = app.route("/revoke", post(revoke_handler));
    }
    app.route_layer(middleware::from_fn_with_state(
        limiter,
        rate_limit_middleware,
    ))
    .route_layer(middleware::from_fn(track_http_metrics))
    .with_state(RegistryState {
        registry,
        admin_token,
    })
    .layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(map_middleware_error))
            .layer(LoadShedLayer::new())
            .layer(ConcurrencyLimitLayer::new(256))
            .layer(TimeoutLayer::new(Duration::from_secs(2))),
    )
    .layer(CatchPanicLayer::new())
    .layer(TraceLayer::new_for_http())
    .layer(RequestBodyLimitLayer::new(16 * 1024))
}

/// Serves the registry until `shutdown_rx` changes.
pub async fn run_server(
    config: RegistryConfig,
    registry: Arc<RevocationRegistry>,
    admin_token: Option<String>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let admin_enabled = admin_token.as_deref().is_some_and(|t| !t.is_empty());
    let app = router(registry, &config, admin_token);
    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        target: "registry",
        addr = %listener.local_addr()?,
        admin_enabled,
        "revocation registry listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_rx.changed().await.ok();
        tracing::info!(target: "registry", "shutting down gracefully");
    })
    .await?;
    Ok(())
}
