// Path: crates/types/src/aggregation.rs
//! The aggregation output document (schema 2.1.0) and its per-primitive signals.
//!
//! Every count is a saturating `u8`: raw event counts are capped at
//! [`MAX_COUNT`] and each `had_*` flag is derived as `count > 0`. Saturating
//! addition is associative and commutative, so the order in which chains and
//! protocols are folded into [`Signals`] never changes the result.

use crate::window::BlockWindow;
use serde::{Deserialize, Serialize};

/// The schema version this build produces and accepts.
pub const SCHEMA_VERSION: &str = "2.1.0";
/// The placeholder written into `commitment.nullifier` by the engine.
pub const NULLIFIER_PLACEHOLDER: &str = "0xNULLIFIER";
/// The cap applied to every count.
pub const MAX_COUNT: u8 = u8::MAX;

/// Caps a raw event count at [`MAX_COUNT`].
pub fn saturate(raw: u64) -> u8 {
    u8::try_from(raw).unwrap_or(MAX_COUNT)
}

/// Borrowing and liquidation activity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LendingSignal {
    /// True when `borrow_count > 0`.
    pub had_borrow: bool,
    /// Number of borrows, saturated.
    pub borrow_count: u8,
    /// True when `liquidation_count > 0`.
    pub had_liquidation: bool,
    /// Number of liquidations suffered, saturated.
    pub liquidation_count: u8,
}

impl LendingSignal {
    /// Builds a signal from raw counts.
    pub fn from_counts(borrows: u64, liquidations: u64) -> Self {
        let borrow_count = saturate(borrows);
        let liquidation_count = saturate(liquidations);
        Self {
            had_borrow: borrow_count > 0,
            borrow_count,
            had_liquidation: liquidation_count > 0,
            liquidation_count,
        }
    }

    fn merge(&mut self, other: &Self) {
        *self = Self::from_counts(
            u64::from(self.borrow_count.saturating_add(other.borrow_count)),
            u64::from(self.liquidation_count.saturating_add(other.liquidation_count)),
        );
    }

    fn is_consistent(&self) -> bool {
        self.had_borrow == (self.borrow_count > 0)
            && self.had_liquidation == (self.liquidation_count > 0)
    }
}

/// Swap and liquidity-provision activity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DexSignal {
    /// True when `swap_count > 0`.
    pub had_swap: bool,
    /// Number of swaps, saturated.
    pub swap_count: u8,
    /// Number of liquidity additions, saturated.
    pub liquidity_add_count: u8,
}

impl DexSignal {
    /// Builds a signal from raw counts.
    pub fn from_counts(swaps: u64, liquidity_adds: u64) -> Self {
        let swap_count = saturate(swaps);
        Self {
            had_swap: swap_count > 0,
            swap_count,
            liquidity_add_count: saturate(liquidity_adds),
        }
    }

    fn merge(&mut self, other: &Self) {
        *self = Self::from_counts(
            u64::from(self.swap_count.saturating_add(other.swap_count)),
            u64::from(
                self.liquidity_add_count
                    .saturating_add(other.liquidity_add_count),
            ),
        );
    }

    fn is_consistent(&self) -> bool {
        self.had_swap == (self.swap_count > 0)
    }
}

/// Staking and vault-deposit activity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct YieldSignal {
    /// True when `deposit_count > 0`.
    pub had_deposit: bool,
    /// Number of deposits, saturated.
    pub deposit_count: u8,
}

impl YieldSignal {
    /// Builds a signal from a raw count.
    pub fn from_counts(deposits: u64) -> Self {
        let deposit_count = saturate(deposits);
        Self {
            had_deposit: deposit_count > 0,
            deposit_count,
        }
    }

    fn merge(&mut self, other: &Self) {
        *self = Self::from_counts(u64::from(
            self.deposit_count.saturating_add(other.deposit_count),
        ));
    }

    fn is_consistent(&self) -> bool {
        self.had_deposit == (self.deposit_count > 0)
    }
}

/// Governance participation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GovernanceSignal {
    /// True when `vote_count > 0`.
    pub had_vote: bool,
    /// Number of votes cast, saturated.
    pub vote_count: u8,
}

impl GovernanceSignal {
    /// Builds a signal from a raw count.
    pub fn from_counts(votes: u64) -> Self {
        let vote_count = saturate(votes);
        Self {
            had_vote: vote_count > 0,
            vote_count,
        }
    }

    fn merge(&mut self, other: &Self) {
        *self = Self::from_counts(u64::from(self.vote_count.saturating_add(other.vote_count)));
    }

    fn is_consistent(&self) -> bool {
        self.had_vote == (self.vote_count > 0)
    }
}

/// The uniformly-shaped result of a single adapter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A lending adapter result.
    Lending(LendingSignal),
    /// A DEX adapter result.
    Dex(DexSignal),
    /// A yield adapter result.
    Yield(YieldSignal),
    /// A governance adapter result.
    Governance(GovernanceSignal),
}

/// The `signals` object of the output document.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Signals {
    /// Lending totals.
    pub lending: LendingSignal,
    /// DEX totals.
    pub dex: DexSignal,
    /// Yield totals.
    #[serde(rename = "yield")]
    pub yields: YieldSignal,
    /// Governance totals.
    pub governance: GovernanceSignal,
}

impl Signals {
    /// Folds one adapter result into the running totals with saturating addition.
    pub fn accumulate(&mut self, signal: &Signal) {
        match signal {
            Signal::Lending(s) => self.lending.merge(s),
            Signal::Dex(s) => self.dex.merge(s),
            Signal::Yield(s) => self.yields.merge(s),
            Signal::Governance(s) => self.governance.merge(s),
        }
    }

    /// Returns true when every `had_*` flag agrees with its count.
    pub fn is_consistent(&self) -> bool {
        self.lending.is_consistent()
            && self.dex.is_consistent()
            && self.yields.is_consistent()
            && self.governance.is_consistent()
    }
}

/// The `metadata` object of the output document.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    /// The lowest chain id the aggregation covered.
    pub chain_id: u64,
    /// The observed block range.
    pub observation_window: BlockWindow,
    /// `end_block + 1`.
    pub aggregation_block: u64,
}

/// Execution invariants. Both are true on every document the engine emits,
/// because any adapter failure aborts the run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Invariants {
    /// Every requested chain was fully queried.
    pub complete_chain_data: bool,
    /// Every adapter returned without error.
    pub adapter_execution_successful: bool,
}

impl Invariants {
    /// Invariants of a run where every adapter succeeded.
    pub fn complete() -> Self {
        Self {
            complete_chain_data: true,
            adapter_execution_successful: true,
        }
    }
}

/// The `commitment` object of the output document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Commitment {
    /// Nullifier placeholder, bound later by the subject.
    pub nullifier: String,
    /// `end_block + 1`.
    pub issued_at_block: u64,
}

/// The canonical, policy-neutral behavioral summary produced by one aggregation run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AggregationOutput {
    /// Always [`SCHEMA_VERSION`].
    pub schema_version: String,
    /// Chain, window and anchor block.
    pub metadata: Metadata,
    /// Saturated per-primitive totals.
    pub signals: Signals,
    /// Execution invariants.
    pub invariants: Invariants,
    /// Nullifier placeholder and issuance anchor.
    pub commitment: Commitment,
}

impl AggregationOutput {
    /// Assembles the document for a successful run over `window`.
    /// `primary_chain` is the lowest chain id that was aggregated.
    pub fn complete(primary_chain: u64, window: BlockWindow, signals: Signals) -> Self {
        let anchor = window.anchor_block();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            metadata: Metadata {
                chain_id: primary_chain,
                observation_window: window,
                aggregation_block: anchor,
            },
            signals,
            invariants: Invariants::complete(),
            commitment: Commitment {
                nullifier: NULLIFIER_PLACEHOLDER.to_string(),
                issued_at_block: anchor,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_yield_field_renamed_on_wire() {
        let json = serde_json::to_value(Signals::default()).unwrap();
        assert!(json.get("yield").is_some());
        assert!(json.get("yields").is_none());
    }

    #[test]
    fn test_complete_output_anchors_one_past_end() {
        let w = BlockWindow::new(100, 200).unwrap();
        let out = AggregationOutput::complete(1, w, Signals::default());
        assert_eq!(out.metadata.aggregation_block, 201);
        assert_eq!(out.commitment.issued_at_block, 201);
        assert_eq!(out.commitment.nullifier, NULLIFIER_PLACEHOLDER);
        assert!(out.invariants.adapter_execution_successful);
    }

    #[test]
    fn test_accumulate_saturates() {
        let mut totals = Signals::default();
        totals.accumulate(&Signal::Lending(LendingSignal::from_counts(200, 0)));
        totals.accumulate(&Signal::Lending(LendingSignal::from_counts(100, 1)));
        assert_eq!(totals.lending.borrow_count, 255);
        assert!(totals.lending.had_borrow);
        assert_eq!(totals.lending.liquidation_count, 1);
        assert!(totals.is_consistent());
    }

    proptest! {
        #[test]
        fn prop_saturation_and_flags(raw in 0u64..100_000) {
            let s = YieldSignal::from_counts(raw);
            prop_assert_eq!(u64::from(s.deposit_count), raw.min(255));
            prop_assert_eq!(s.had_deposit, s.deposit_count > 0);
        }

        #[test]
        fn prop_accumulation_is_order_independent(a in 0u64..400, b in 0u64..400, c in 0u64..400) {
            let sigs = [
                Signal::Dex(DexSignal::from_counts(a, c)),
                Signal::Dex(DexSignal::from_counts(b, a)),
                Signal::Dex(DexSignal::from_counts(c, b)),
            ];
            let mut forward = Signals::default();
            sigs.iter().for_each(|s| forward.accumulate(s));
            let mut backward = Signals::default();
            sigs.iter().rev().for_each(|s| backward.accumulate(s));
            prop_assert_eq!(forward, backward);
            prop_assert_eq!(u64::from(forward.dex.swap_count), (a + b + c).min(255));
        }
    }
}
