// Path: crates/notary/tests/attest.rs
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use plight_crypto::sign::eddsa::{NotaryKeyPair, NotaryPrivateKey};
use plight_engine::adapters::adapter_for;
use plight_engine::testing::{log_at, MockEthRpc, MockRpcProvider};
use plight_engine::{AggregationEngine, LogFetcher, NopObserver};
use plight_notary::issuer::{verify_signature, FixedClock};
use plight_notary::server::{router, AttestResponse};
use plight_notary::{AttestationIssuer, VerificationService};
use plight_types::config::{MismatchPolicy, NotaryConfig};
use plight_types::protocol::Protocol;
use plight_types::Address;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SUBJECT: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb1";

fn chain_with_one_swap() -> Arc<MockEthRpc> {
    let rpc = Arc::new(MockEthRpc::new());
    let swap = adapter_for(Protocol::UniswapV2).unwrap().events[0].topic0();
    let subject = SUBJECT.parse::<Address>().unwrap().to_topic();
    let other = format!("0x{}", "0".repeat(64));
    rpc.push_log(log_at(150, "0x01", 0, &[&swap, &subject, &other]));
    rpc
}

fn app(rpc: Arc<MockEthRpc>, policy: MismatchPolicy) -> Router {
    let engine = AggregationEngine::new(
        Arc::new(MockRpcProvider::new().with_chain(1, rpc)),
        LogFetcher::default(),
    )
    .with_observer(Arc::new(NopObserver));
    let sk = NotaryPrivateKey::from_hex(&format!("0x{}", "42".repeat(32))).unwrap();
    let keypair = Arc::new(NotaryKeyPair::from_private_key(sk).unwrap());
    let config = NotaryConfig {
        mismatch_policy: policy,
        ..NotaryConfig::default()
    };
    let issuer = AttestationIssuer::new(VerificationService::new(Arc::new(engine)), keypair, &config)
        .unwrap()
        .with_clock(Arc::new(FixedClock::new(1_700_000_000)));
    router(Arc::new(issuer), &config)
}

fn request_body(extra: Value) -> Value {
    let mut body = json!({
        "version": "1.0",
        "subject": SUBJECT,
        "chainId": 1,
        "protocol": "uniswap_v2",
        "window": { "from": 1_699_000_000u64, "to": 1_700_000_000u64 },
        "blockRange": { "fromBlock": 100, "toBlock": 200 }
    });
    if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }
    body
}

async fn post(app: Router, body: Value) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::post("/attest")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn attest_without_claim_signs_the_trusted_aggregation() {
    let (status, body) = post(
        app(chain_with_one_swap(), MismatchPolicy::Permissive),
        request_body(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let resp: AttestResponse = serde_json::from_value(body).unwrap();
    assert_eq!(resp.attestation.version, "1.0");
    assert_eq!(resp.attestation.issuer, "plight-notary-v1");
    assert_eq!(resp.attestation.issued_at, 1_700_000_000);
    assert_eq!(resp.attestation.expires_at, 1_700_003_600);
    assert_eq!(resp.attestation.block_range.from_block, 100);
    assert_eq!(resp.signature.scheme, "eddsa-poseidon");
    assert_eq!(resp.envelope.domain.chain_id, 1);
    assert_eq!(resp.envelope.aggregation.window_end_block, 200);

    let public_key = resp.signature.public_key.unwrap();
    verify_signature(&public_key, &resp.attestation.summary_hash, &resp.signature.value).unwrap();
}

#[tokio::test]
async fn strict_policy_refuses_a_forged_claim_with_422() {
    let forged = json!({
        "schema_version": "2.1.0",
        "metadata": {
            "chain_id": 1,
            "observation_window": { "start_block": 100, "end_block": 200 },
            "aggregation_block": 201
        },
        "signals": {
            "lending": { "had_borrow": true, "borrow_count": 9, "had_liquidation": false, "liquidation_count": 0 },
            "dex": { "had_swap": true, "swap_count": 1, "liquidity_add_count": 0 },
            "yield": { "had_deposit": false, "deposit_count": 0 },
            "governance": { "had_vote": false, "vote_count": 0 }
        },
        "invariants": { "complete_chain_data": true, "adapter_execution_successful": true },
        "commitment": { "nullifier": "0xNULLIFIER", "issued_at_block": 201 }
    });
    let (status, body) = post(
        app(chain_with_one_swap(), MismatchPolicy::Strict),
        request_body(json!({ "payload": forged })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "ATTEST_VERIFICATION_MISMATCH");
}

#[tokio::test]
async fn rpc_failure_is_a_structured_422() {
    let rpc = Arc::new(MockEthRpc::new());
    rpc.fail_all(plight_types::error::RpcError::Node {
        code: -32000,
        message: "header not found".into(),
    });
    let (status, body) = post(app(rpc, MismatchPolicy::Permissive), request_body(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "ATTEST_VERIFICATION_FAILED");
}

#[tokio::test]
async fn malformed_requests_get_400() {
    let cases = [
        json!({ "version": "2.0" }),
        json!({ "subject": "0x1234" }),
        json!({ "protocol": "sushiswap" }),
        json!({ "protocol": "pangolin" }),
        json!({ "blockRange": { "fromBlock": 200, "toBlock": 200 } }),
        json!({ "unexpected": true }),
        json!({ "nullifierCommitment": "nope" }),
    ];
    for extra in cases {
        let (status, body) = post(
            app(Arc::new(MockEthRpc::new()), MismatchPolicy::Permissive),
            request_body(extra.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{extra} -> {body}");
        assert!(body["error"]["code"].is_string());
    }
}

#[tokio::test]
async fn info_reports_the_signing_key() {
    let resp = app(Arc::new(MockEthRpc::new()), MismatchPolicy::Permissive)
        .oneshot(Request::get("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let info: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(info["scheme"], "eddsa-poseidon");
    assert_eq!(info["aggregationEngineVersion"], "2.1.0");
    assert!(info["keyId"].as_str().unwrap().starts_with("bjj-"));
    assert_eq!(info["publicKey"].as_array().unwrap().len(), 2);
}
