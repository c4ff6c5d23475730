// Path: crates/engine/src/adapters/mod.rs
//! Protocol adapters.
//!
//! Every protocol is described by an [`AdapterSpec`]: the contract to resolve, whether
//! the log query is scoped to that contract, and the events to count. A single
//! generic routine, [`fetch_signal`], turns a spec into a saturated [`Signal`].

mod table;

pub use table::ADAPTERS;

use crate::fetcher::LogFetcher;
use crate::matrix;
use crate::observer::AggregationObserver;
use crate::rpc::{EthRpc, Log};
use futures_util::future::try_join_all;
use plight_crypto::algorithms::hash::event_topic;
use plight_types::address::Address;
use plight_types::aggregation::{
    DexSignal, GovernanceSignal, LendingSignal, Signal, YieldSignal,
};
use plight_types::error::AggregationError;
use plight_types::protocol::{Primitive, Protocol};
use plight_types::window::BlockWindow;
use std::collections::HashSet;

/// Where the subject appears in a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectMatch {
    /// An indexed argument, matched by the node.
    Topic(usize),
    /// A non-indexed argument, matched client-side against a 32-byte data word.
    DataWord(usize),
}

/// The signal counter an event increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// `lending.borrow_count`.
    Borrow,
    /// `lending.liquidation_count`.
    Liquidation,
    /// `dex.swap_count`.
    Swap,
    /// `dex.liquidity_add_count`.
    LiquidityAdd,
    /// `yield.deposit_count`.
    Deposit,
    /// `governance.vote_count`.
    Vote,
}

/// One event an adapter counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSpec {
    /// Short event name for diagnostics.
    pub name: &'static str,
    /// Canonical Solidity signature; `topic0` is its keccak-256 hash.
    pub signature: &'static str,
    /// Subject positions. A log is counted once even if the subject appears at
    /// several of them.
    pub subject: &'static [SubjectMatch],
    /// The counter the event increments.
    pub counter: Counter,
}

impl EventSpec {
    /// The event's `topic0`.
    pub fn topic0(&self) -> String {
        event_topic(self.signature)
    }
}

/// A declarative protocol adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSpec {
    /// The protocol this adapter observes.
    pub protocol: Protocol,
    /// The matrix contract that must resolve on the chain.
    pub contract: &'static str,
    /// Whether log queries are restricted to the resolved contract address.
    pub scoped: bool,
    /// The events to count.
    pub events: &'static [EventSpec],
}

/// The adapter for `protocol`.
pub fn adapter_for(protocol: Protocol) -> Result<&'static AdapterSpec, AggregationError> {
    ADAPTERS
        .iter()
        .find(|a| a.protocol == protocol)
        .ok_or_else(|| AggregationError::UnsupportedProtocol(protocol.to_string()))
}

/// Everything an adapter needs from its caller for one run.
#[derive(Clone, Copy)]
pub struct AdapterContext<'a> {
    /// The chain's RPC client.
    pub rpc: &'a dyn EthRpc,
    /// The log fetcher.
    pub fetcher: &'a LogFetcher,
    /// The run's observer.
    pub observer: &'a dyn AggregationObserver,
}

#[derive(Debug, Default)]
struct Tally {
    borrow: u64,
    liquidation: u64,
    swap: u64,
    liquidity_add: u64,
    deposit: u64,
    vote: u64,
}

impl Tally {
    fn add(&mut self, counter: Counter, n: u64) {
        let slot = match counter {
            Counter::Borrow => &mut self.borrow,
            Counter::Liquidation => &mut self.liquidation,
            Counter::Swap => &mut self.swap,
            Counter::LiquidityAdd => &mut self.liquidity_add,
            Counter::Deposit => &mut self.deposit,
            Counter::Vote => &mut self.vote,
        };
        *slot = slot.saturating_add(n);
    }

    fn into_signal(self, primitive: Primitive) -> Signal {
        match primitive {
            Primitive::Lending => {
                Signal::Lending(LendingSignal::from_counts(self.borrow, self.liquidation))
            }
            Primitive::Dex => Signal::Dex(DexSignal::from_counts(self.swap, self.liquidity_add)),
            Primitive::Yield => Signal::Yield(YieldSignal::from_counts(self.deposit)),
            Primitive::Governance => Signal::Governance(GovernanceSignal::from_counts(self.vote)),
        }
    }
}

struct Query {
    event: usize,
    subject: SubjectMatch,
    topics: Vec<Option<String>>,
}

fn topics_for(topic0: &str, m: SubjectMatch, subject_topic: &str) -> Vec<Option<String>> {
    let mut topics = vec![Some(topic0.to_string())];
    if let SubjectMatch::Topic(position) = m {
        topics.resize(position.max(1), None);
        topics.push(Some(subject_topic.to_string()));
    }
    topics
}

fn subject_matches(log: &Log, m: SubjectMatch, subject_topic: &str, subject_word: &str) -> bool {
    match m {
        SubjectMatch::Topic(position) => log
            .topic(position)
            .is_some_and(|t| t.eq_ignore_ascii_case(subject_topic)),
        SubjectMatch::DataWord(index) => log.data_word(index).as_deref() == Some(subject_word),
    }
}

/// Counts the subject's events for one protocol on one chain over `window`.
///
/// Fails with `UnsupportedChain` when the protocol is not deployed on the chain and
/// propagates the first irrecoverable RPC error. Queries for the adapter's events
/// run concurrently; logs matched by more than one query are counted once.
pub async fn fetch_signal(
    spec: &AdapterSpec,
    ctx: AdapterContext<'_>,
    chain_id: u64,
    window: &BlockWindow,
    subject: &Address,
) -> Result<Signal, AggregationError> {
    let primitive = spec.protocol.primitive();
    let address = matrix::resolve(spec.protocol, primitive, chain_id, spec.contract)?;
    ctx.observer
        .address_resolved(chain_id, spec.protocol, &address);
    let scope = spec.scoped.then_some(address);

    let subject_topic = subject.to_topic();
    let subject_word = hex::encode(subject.to_word());

    let queries: Vec<Query> = spec
        .events
        .iter()
        .enumerate()
        .flat_map(|(event, ev)| {
            let topic0 = ev.topic0();
            let subject_topic = subject_topic.as_str();
            ev.subject.iter().map(move |m| Query {
                event,
                subject: *m,
                topics: topics_for(&topic0, *m, subject_topic),
            })
        })
        .collect();

    let results = try_join_all(queries.iter().map(|q| {
        ctx.fetcher.fetch_logs(
            ctx.rpc,
            scope,
            &q.topics,
            window.start_block,
            window.end_block,
            ctx.fetcher.chunk_size(),
            ctx.observer,
        )
    }))
    .await?;

    let mut tally = Tally::default();
    for (event_idx, ev) in spec.events.iter().enumerate() {
        let mut seen: HashSet<(u64, &str, u64)> = HashSet::new();
        for (q, logs) in queries.iter().zip(&results) {
            if q.event != event_idx {
                continue;
            }
            for log in logs {
                if subject_matches(log, q.subject, &subject_topic, &subject_word) {
                    seen.insert(log.key());
                }
            }
        }
        ctx.observer
            .events_fetched(chain_id, spec.protocol, ev.name, seen.len());
        tally.add(ev.counter, seen.len() as u64);
    }
    Ok(tally.into_signal(primitive))
}
