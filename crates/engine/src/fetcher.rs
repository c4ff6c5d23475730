// Path: crates/engine/src/fetcher.rs
//! Resilient `eth_getLogs` retrieval.
//!
//! A request range is cut into fixed-size chunks. Each chunk is fetched from a
//! worklist of sub-ranges: when a provider rejects a range as too large, the
//! range is bisected and both halves are pushed back. Splitting stops at a
//! single block, or at the configured depth, whichever comes first.

use crate::observer::AggregationObserver;
use crate::rpc::{EthRpc, Log, LogFilter};
use plight_telemetry::rpc_metrics;
use plight_types::address::Address;
use plight_types::config::FetcherConfig;
use plight_types::error::RpcError;
use std::collections::HashSet;

/// Chunked, adaptively split log retrieval.
#[derive(Debug, Clone)]
pub struct LogFetcher {
    config: FetcherConfig,
}

impl Default for LogFetcher {
    fn default() -> Self {
        Self::new(FetcherConfig::default())
    }
}

impl LogFetcher {
    /// Creates a fetcher with the given tuning.
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// The configured top-level chunk size.
    pub fn chunk_size(&self) -> u64 {
        self.config.chunk_size
    }

    /// Fetches every log matching `address` and `topics` in `[from_block, to_block]`.
    ///
    /// The result is ordered by `(block, log index)` and free of duplicates.
    pub async fn fetch_logs(
        &self,
        rpc: &dyn EthRpc,
        address: Option<Address>,
        topics: &[Option<String>],
        from_block: u64,
        to_block: u64,
        chunk_size: u64,
        observer: &dyn AggregationObserver,
    ) -> Result<Vec<Log>, RpcError> {
        let mut logs = Vec::new();
        if from_block > to_block {
            return Ok(logs);
        }
        let base = LogFilter {
            address,
            topics: topics.to_vec(),
            from_block,
            to_block,
        };
        let step = chunk_size.max(1) - 1;
        let mut start = from_block;
        loop {
            let end = start.saturating_add(step).min(to_block);
            self.fetch_chunk(rpc, &base.with_range(start, end), observer, &mut logs)
                .await?;
            if end >= to_block {
                break;
            }
            start = end + 1;
        }
        Ok(sort_and_dedup(logs))
    }

    async fn fetch_chunk(
        &self,
        rpc: &dyn EthRpc,
        chunk: &LogFilter,
        observer: &dyn AggregationObserver,
        out: &mut Vec<Log>,
    ) -> Result<(), RpcError> {
        let mut worklist: Vec<(u64, u64, u32)> = vec![(chunk.from_block, chunk.to_block, 0)];
        while let Some((from, to, depth)) = worklist.pop() {
            let err = match rpc.get_logs(&chunk.with_range(from, to)).await {
                Ok(logs) => {
                    out.extend(logs);
                    continue;
                }
                Err(e) => e,
            };
            if !self.is_splittable(&err, from, to) {
                return Err(err);
            }
            if depth >= self.config.max_split_depth {
                return Err(RpcError::SplitExhausted {
                    from,
                    to,
                    reason: err.to_string(),
                });
            }
            observer.range_split(from, to, &err);
            rpc_metrics().inc_range_splits();
            let mid = from + (to - from) / 2;
            // The left half is popped first.
            worklist.push((mid + 1, to, depth + 1));
            worklist.push((from, mid, depth + 1));
        }
        Ok(())
    }

    fn is_splittable(&self, err: &RpcError, from: u64, to: u64) -> bool {
        let span = to - from + 1;
        match err {
            RpcError::Limit(_) => span > 1,
            RpcError::Transport(_) => span > self.config.split_threshold.max(1),
            _ => false,
        }
    }
}

/// Orders logs by `(block, log index)` and drops repeats of the same
/// `(block, transaction, log index)`.
pub fn sort_and_dedup(mut logs: Vec<Log>) -> Vec<Log> {
    logs.sort_by(|a, b| {
        (a.block_number, a.log_index, &a.transaction_hash).cmp(&(
            b.block_number,
            b.log_index,
            &b.transaction_hash,
        ))
    });
    let mut seen = HashSet::new();
    logs.retain(|log| seen.insert((log.block_number, log.transaction_hash.clone(), log.log_index)));
    logs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NopObserver;
    use crate::testing::{log_at, MockEthRpc};
    use proptest::prelude::*;

    fn fetcher(split_threshold: u64, max_split_depth: u32) -> LogFetcher {
        LogFetcher::new(FetcherConfig {
            split_threshold,
            max_split_depth,
            ..FetcherConfig::default()
        })
    }

    #[tokio::test]
    async fn test_chunks_cover_range_exactly() {
        let rpc = MockEthRpc::new();
        let f = LogFetcher::default();
        f.fetch_logs(&rpc, None, &[], 0, 25, 10, &NopObserver)
            .await
            .unwrap();
        assert_eq!(rpc.requested_ranges(), vec![(0, 9), (10, 19), (20, 25)]);
    }

    #[tokio::test]
    async fn test_empty_range_makes_no_calls() {
        let rpc = MockEthRpc::new();
        let logs = LogFetcher::default()
            .fetch_logs(&rpc, None, &[], 10, 9, 10, &NopObserver)
            .await
            .unwrap();
        assert!(logs.is_empty());
        assert!(rpc.requested_ranges().is_empty());
    }

    #[tokio::test]
    async fn test_limit_errors_bisect_until_success() {
        let rpc = MockEthRpc::new().with_max_span(3);
        rpc.push_log(log_at(5, "0x05", 0, &[]));
        rpc.push_log(log_at(2, "0x02", 1, &[]));
        let logs = LogFetcher::default()
            .fetch_logs(&rpc, None, &[], 0, 9, 10, &NopObserver)
            .await
            .unwrap();
        assert_eq!(
            logs.iter().map(|l| l.block_number).collect::<Vec<_>>(),
            vec![2, 5]
        );
        for (from, to) in rpc.successful_ranges() {
            assert!(to - from + 1 <= 3);
        }
    }

    #[tokio::test]
    async fn test_single_block_limit_is_fatal() {
        let rpc = MockEthRpc::new().with_max_span(0);
        let err = LogFetcher::default()
            .fetch_logs(&rpc, None, &[], 0, 3, 10, &NopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Limit(_)));
    }

    #[tokio::test]
    async fn test_transport_errors_split_only_wide_ranges() {
        let rpc = MockEthRpc::new();
        rpc.fail_spans_wider_than(4, RpcError::Transport("timeout".into()));
        let logs = fetcher(4, 32)
            .fetch_logs(&rpc, None, &[], 0, 15, 100, &NopObserver)
            .await;
        assert!(logs.is_ok());

        // Same failure, but the threshold forbids splitting the 16-block range.
        let rpc = MockEthRpc::new();
        rpc.fail_spans_wider_than(4, RpcError::Transport("timeout".into()));
        let err = fetcher(16, 32)
            .fetch_logs(&rpc, None, &[], 0, 15, 100, &NopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));
    }

    #[tokio::test]
    async fn test_node_errors_are_not_split() {
        let rpc = MockEthRpc::new();
        rpc.fail_spans_wider_than(
            0,
            RpcError::Node {
                code: -32601,
                message: "method not found".into(),
            },
        );
        let err = LogFetcher::default()
            .fetch_logs(&rpc, None, &[], 0, 100, 1000, &NopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Node { .. }));
        assert_eq!(rpc.requested_ranges().len(), 1);
    }

    #[tokio::test]
    async fn test_split_depth_is_bounded() {
        let rpc = MockEthRpc::new().with_max_span(1);
        let err = fetcher(2_000, 2)
            .fetch_logs(&rpc, None, &[], 0, 63, 64, &NopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::SplitExhausted { .. }));
    }

    #[test]
    fn test_sort_and_dedup() {
        let logs = vec![
            log_at(7, "0xb", 1, &[]),
            log_at(3, "0xa", 4, &[]),
            log_at(7, "0xb", 0, &[]),
            log_at(3, "0xa", 4, &[]),
        ];
        let out = sort_and_dedup(logs);
        assert_eq!(
            out.iter()
                .map(|l| (l.block_number, l.log_index))
                .collect::<Vec<_>>(),
            vec![(3, 4), (7, 0), (7, 1)]
        );
    }

    proptest! {
        #[test]
        fn prop_sort_and_dedup_is_ordered_and_idempotent(
            raw in proptest::collection::vec((0u64..20, 0u64..4, 0u8..3), 0..40)
        ) {
            let logs: Vec<Log> = raw
                .iter()
                .map(|(block, index, tx)| log_at(*block, &format!("0x{tx}"), *index, &[]))
                .collect();
            let once = sort_and_dedup(logs);
            for pair in once.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!((a.block_number, a.log_index) <= (b.block_number, b.log_index));
                prop_assert!(a.key() != b.key());
            }
            prop_assert_eq!(sort_and_dedup(once.clone()), once);
        }
    }
}
