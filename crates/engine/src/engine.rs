// Path: crates/engine/src/engine.rs
//! The aggregation orchestrator.

use crate::adapters::{adapter_for, fetch_signal, AdapterContext};
use crate::fetcher::LogFetcher;
use crate::matrix;
use crate::observer::{AggregationObserver, TracingObserver};
use crate::rpc::{ConfigRpcProvider, RpcProvider};
use async_trait::async_trait;
use plight_telemetry::{aggregation_metrics, time::Timer};
use plight_types::address::Address;
use plight_types::aggregation::{AggregationOutput, Signals};
use plight_types::codec;
use plight_types::config::PlightConfig;
use plight_types::error::AggregationError;
use plight_types::protocol::{is_supported_chain, Primitive};
use plight_types::window::BlockWindow;
use plight_types::Result;
use std::sync::Arc;

/// Anything that can produce the canonical aggregation document. The verifier
/// depends on this seam rather than on a concrete engine.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Aggregates `subject`'s activity over `[start_block, end_block]` on every
    /// chain in `chain_ids` and returns canonical JSON.
    async fn aggregate(
        &self,
        chain_ids: &[u64],
        start_block: u64,
        end_block: u64,
        subject: &str,
    ) -> Result<String>;
}

/// Runs every applicable adapter across chains and merges the results.
///
/// Chains and adapters run sequentially and the first failure aborts the call;
/// a document is only ever produced from complete data. The engine holds no
/// mutable state, so one instance can serve concurrent runs.
pub struct AggregationEngine {
    provider: Arc<dyn RpcProvider>,
    fetcher: LogFetcher,
    observer: Arc<dyn AggregationObserver>,
}

impl AggregationEngine {
    /// Creates an engine that logs runs through `tracing`.
    pub fn new(provider: Arc<dyn RpcProvider>, fetcher: LogFetcher) -> Self {
        Self {
            provider,
            fetcher,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Creates an engine backed by HTTP JSON-RPC endpoints from configuration.
    pub fn from_config(config: Arc<PlightConfig>) -> Self {
        let fetcher = LogFetcher::new(config.fetcher.clone());
        Self::new(Arc::new(ConfigRpcProvider::new(config)), fetcher)
    }

    /// Replaces the observer used by [`Aggregator::aggregate`].
    pub fn with_observer(mut self, observer: Arc<dyn AggregationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Aggregates with the engine's default observer.
    pub async fn aggregate_output(
        &self,
        chain_ids: &[u64],
        start_block: u64,
        end_block: u64,
        subject: &Address,
    ) -> Result<AggregationOutput> {
        self.aggregate_output_with(
            chain_ids,
            start_block,
            end_block,
            subject,
            self.observer.as_ref(),
        )
        .await
    }

    /// Aggregates, reporting progress to `observer`.
    pub async fn aggregate_output_with(
        &self,
        chain_ids: &[u64],
        start_block: u64,
        end_block: u64,
        subject: &Address,
        observer: &dyn AggregationObserver,
    ) -> Result<AggregationOutput> {
        let _timer = Timer::new(|secs| aggregation_metrics().observe_aggregation_duration(secs));
        let result = self
            .run(chain_ids, start_block, end_block, subject, observer)
            .await;
        match &result {
            Ok(output) => {
                aggregation_metrics().inc_aggregations("success");
                observer.run_finished(output);
            }
            Err(e) => {
                aggregation_metrics().inc_aggregations("failure");
                observer.run_failed(e);
            }
        }
        result
    }

    async fn run(
        &self,
        chain_ids: &[u64],
        start_block: u64,
        end_block: u64,
        subject: &Address,
        observer: &dyn AggregationObserver,
    ) -> Result<AggregationOutput> {
        let chains = normalize_chains(chain_ids)?;
        let window = BlockWindow::new(start_block, end_block)?;
        let primary = *chains.first().ok_or(AggregationError::NoChains)?;
        observer.run_started(&chains, &window, subject);

        let mut signals = Signals::default();
        for &chain_id in &chains {
            let rpc = self.provider.client(chain_id)?;
            let ctx = AdapterContext {
                rpc: rpc.as_ref(),
                fetcher: &self.fetcher,
                observer,
            };
            for primitive in Primitive::ALL {
                for protocol in matrix::applicable(primitive, chain_id) {
                    let spec = adapter_for(protocol)?;
                    match fetch_signal(spec, ctx, chain_id, &window, subject).await {
                        Ok(signal) => {
                            aggregation_metrics().inc_adapter_calls(protocol.as_str(), "success");
                            observer.adapter_finished(chain_id, protocol, &signal);
                            signals.accumulate(&signal);
                        }
                        Err(e) => {
                            aggregation_metrics().inc_adapter_calls(protocol.as_str(), "failure");
                            observer.adapter_failed(chain_id, protocol, &e);
                            return Err(e);
                        }
                    }
                }
            }
        }

        let output = AggregationOutput::complete(primary, window, signals);
        codec::validate(&output)?;
        Ok(output)
    }
}

/// Sorts and de-duplicates chain ids, rejecting an empty list and unknown chains.
pub fn normalize_chains(chain_ids: &[u64]) -> Result<Vec<u64>> {
    let mut chains = chain_ids.to_vec();
    chains.sort_unstable();
    chains.dedup();
    if chains.is_empty() {
        return Err(AggregationError::NoChains);
    }
    if let Some(&bad) = chains.iter().find(|c| !is_supported_chain(**c)) {
        return Err(AggregationError::UnsupportedChain(bad));
    }
    Ok(chains)
}

#[async_trait]
impl Aggregator for AggregationEngine {
    async fn aggregate(
        &self,
        chain_ids: &[u64],
        start_block: u64,
        end_block: u64,
        subject: &str,
    ) -> Result<String> {
        let subject: Address = subject.parse()?;
        let output = self
            .aggregate_output(chain_ids, start_block, end_block, &subject)
            .await?;
        Ok(codec::serialize_string(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chains() {
        assert_eq!(normalize_chains(&[137, 1, 137]).unwrap(), vec![1, 137]);
        assert_eq!(normalize_chains(&[]), Err(AggregationError::NoChains));
        assert_eq!(
            normalize_chains(&[1, 56]),
            Err(AggregationError::UnsupportedChain(56))
        );
    }
}
