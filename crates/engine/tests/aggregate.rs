// Path: crates/engine/tests/aggregate.rs
use plight_engine::adapters::adapter_for;
use plight_engine::testing::{log_at, MockEthRpc, MockRpcProvider};
use plight_engine::{AggregationEngine, AggregationObserver, Aggregator, LogFetcher, NopObserver};
use plight_types::address::Address;
use plight_types::aggregation::Signal;
use plight_types::codec;
use plight_types::error::{AggregationError, RpcError};
use plight_types::protocol::Protocol;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SUBJECT: &str = "0x742d35cc6634c0532925a3b844bc9e7595f0beb1";

fn engine(provider: MockRpcProvider) -> AggregationEngine {
    AggregationEngine::new(Arc::new(provider), LogFetcher::default())
        .with_observer(Arc::new(NopObserver))
}

fn subject_topic() -> String {
    SUBJECT.parse::<Address>().unwrap().to_topic()
}

#[tokio::test]
async fn empty_window_yields_zero_signals_and_true_invariants() {
    let provider = MockRpcProvider::new().with_chain(1, Arc::new(MockEthRpc::new()));
    let json = engine(provider)
        .aggregate(&[1], 100, 200, SUBJECT)
        .await
        .unwrap();

    let output = codec::parse_output(json.as_bytes()).unwrap();
    assert!(!output.signals.lending.had_borrow);
    assert_eq!(output.signals.lending.borrow_count, 0);
    assert!(output.invariants.adapter_execution_successful);
    assert!(output.invariants.complete_chain_data);
    assert_eq!(output.metadata.chain_id, 1);
    assert_eq!(output.metadata.aggregation_block, 201);
    assert_eq!(output.commitment.issued_at_block, 201);
    assert_eq!(output.commitment.nullifier, "0xNULLIFIER");

    // The returned string is already canonical.
    assert_eq!(
        codec::canonicalize(json.as_bytes()).unwrap(),
        json.as_bytes().to_vec()
    );
}

#[tokio::test]
async fn one_failing_chain_fails_the_whole_run() {
    let healthy = Arc::new(MockEthRpc::new());
    let broken = Arc::new(MockEthRpc::new());
    broken.fail_all(RpcError::Node {
        code: -32000,
        message: "header not found".into(),
    });
    let provider = MockRpcProvider::new()
        .with_chain(1, healthy)
        .with_chain(137, broken);

    let err = engine(provider)
        .aggregate(&[137, 1], 100, 200, SUBJECT)
        .await
        .unwrap_err();
    assert!(matches!(err, AggregationError::Rpc(RpcError::Node { .. })));
}

#[tokio::test]
async fn counts_merge_across_chains_and_report_lowest_chain() {
    let eth = Arc::new(MockEthRpc::new());
    let polygon = Arc::new(MockEthRpc::new());
    let v2 = adapter_for(Protocol::UniswapV2).unwrap().events[0].topic0();
    let quick = adapter_for(Protocol::Quickswap).unwrap().events[0].topic0();
    let other = format!("0x{}", "0".repeat(64));
    eth.push_log(log_at(150, "0x01", 0, &[&v2, &subject_topic(), &other]));
    polygon.push_log(log_at(160, "0x02", 0, &[&quick, &other, &subject_topic()]));
    polygon.push_log(log_at(161, "0x03", 0, &[&quick, &subject_topic(), &other]));

    let provider = MockRpcProvider::new()
        .with_chain(1, eth)
        .with_chain(137, polygon);
    let output = engine(provider)
        .aggregate_output(&[137, 1, 137], 100, 200, &SUBJECT.parse().unwrap())
        .await
        .unwrap();
    assert_eq!(output.metadata.chain_id, 1);
    assert_eq!(output.signals.dex.swap_count, 3);
    assert!(output.signals.dex.had_swap);
    assert_eq!(output.signals.dex.liquidity_add_count, 0);
}

#[tokio::test]
async fn invalid_inputs_are_rejected_before_any_rpc() {
    let rpc = Arc::new(MockEthRpc::new());
    let e = engine(MockRpcProvider::new().with_chain(1, rpc.clone()));
    assert_eq!(
        e.aggregate(&[], 100, 200, SUBJECT).await.unwrap_err(),
        AggregationError::NoChains
    );
    assert!(matches!(
        e.aggregate(&[1], 200, 200, SUBJECT).await.unwrap_err(),
        AggregationError::InvalidWindow { .. }
    ));
    assert!(matches!(
        e.aggregate(&[1], 100, 200, "0x1234").await.unwrap_err(),
        AggregationError::InvalidAddress(_)
    ));
    assert_eq!(
        e.aggregate(&[999], 100, 200, SUBJECT).await.unwrap_err(),
        AggregationError::UnsupportedChain(999)
    );
    assert!(rpc.requested_ranges().is_empty());
}

#[tokio::test]
async fn missing_endpoint_is_an_rpc_error() {
    let err = engine(MockRpcProvider::new())
        .aggregate(&[10], 100, 200, SUBJECT)
        .await
        .unwrap_err();
    assert_eq!(err, AggregationError::Rpc(RpcError::MissingEndpoint(10)));
}

#[derive(Default)]
struct Counting {
    adapters: AtomicUsize,
    finished: AtomicUsize,
}

impl AggregationObserver for Counting {
    fn adapter_finished(&self, _chain_id: u64, _protocol: Protocol, _signal: &Signal) {
        self.adapters.fetch_add(1, Ordering::SeqCst);
    }
    fn run_finished(&self, _output: &plight_types::AggregationOutput) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn per_run_observer_sees_every_adapter() {
    let provider = MockRpcProvider::new().with_chain(10, Arc::new(MockEthRpc::new()));
    let observer = Counting::default();
    engine(provider)
        .aggregate_output_with(&[10], 1, 2, &SUBJECT.parse().unwrap(), &observer)
        .await
        .unwrap();
    // Optimism: aave_v3 and uniswap_v3.
    assert_eq!(observer.adapters.load(Ordering::SeqCst), 2);
    assert_eq!(observer.finished.load(Ordering::SeqCst), 1);
}
