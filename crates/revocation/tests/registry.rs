// Path: crates/revocation/tests/registry.rs
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use plight_revocation::server::{router, RevokeResponse, RevokedResponse, ADMIN_TOKEN_HEADER};
use plight_revocation::RevocationRegistry;
use plight_types::config::RegistryConfig;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const HASH: &str = "0xabababababababababababababababababababababababababababababababab";

fn app(registry: Arc<RevocationRegistry>, admin_token: Option<&str>) -> Router {
    router(
        registry,
        &RegistryConfig::default(),
        admin_token.map(str::to_string),
    )
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn revoked_query(hash: &str) -> Request<Body> {
    Request::get(format!("/revoked?attestationHash={hash}"))
        .body(Body::empty())
        .unwrap()
}

fn revoke_request(token: Option<&str>, hash: &str) -> Request<Body> {
    let mut builder = Request::post("/revoke").header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(ADMIN_TOKEN_HEADER, token);
    }
    builder
        .body(Body::from(
            serde_json::json!({ "attestationHash": hash, "reason": "fraud" }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn lookup_reports_revocation_status() {
    let registry = Arc::new(RevocationRegistry::new());
    let (status, body) = send(app(registry.clone(), None), revoked_query(HASH)).await;
    assert_eq!(status, StatusCode::OK);
    let resp: RevokedResponse = serde_json::from_value(body).unwrap();
    assert!(!resp.revoked);
    assert_eq!(resp.attestation_hash, HASH);
    assert!(resp.timestamp > 1_600_000_000_000);

    registry.revoke(HASH, None);
    let (_, body) = send(app(registry, None), revoked_query(HASH)).await;
    assert_eq!(body["revoked"], true);
}

#[tokio::test]
async fn malformed_hashes_get_400() {
    for bad in ["0x1234", "abababababababababababababababababababababababababababababababab", ""] {
        let (status, body) = send(
            app(Arc::new(RevocationRegistry::new()), None),
            revoked_query(bad),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }
    let (status, _) = send(
        app(Arc::new(RevocationRegistry::new()), None),
        Request::get("/revoked").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn revoke_requires_the_admin_token() {
    let registry = Arc::new(RevocationRegistry::new());

    // Without a configured token the route does not exist.
    let (status, _) = send(app(registry.clone(), None), revoke_request(Some("s3cret"), HASH)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(app(registry.clone(), Some("s3cret")), revoke_request(None, HASH)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        app(registry.clone(), Some("s3cret")),
        revoke_request(Some("guess"), HASH),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!registry.is_revoked(HASH));

    let (status, body) = send(
        app(registry.clone(), Some("s3cret")),
        revoke_request(Some("s3cret"), HASH),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let resp: RevokeResponse = serde_json::from_value(body).unwrap();
    assert!(resp.newly_revoked);
    assert!(registry.is_revoked(HASH));
    assert_eq!(registry.record(HASH).unwrap().reason, "fraud");

    let (status, _) = send(
        app(registry, Some("s3cret")),
        revoke_request(Some("s3cret"), "0xnothex"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn healthz_is_served() {
    let resp = app(Arc::new(RevocationRegistry::new()), None)
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
