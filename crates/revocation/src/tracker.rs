// Path: crates/revocation/src/tracker.rs
//! The forward-only revocation scanner.
//!
//! Each scan covers `[last_scanned + 1, min(last_scanned + 1 + max_blocks, head)]`
//! and raises the cutoff to the highest block holding a disqualifying event. A
//! scan either persists a complete new state or nothing at all.

use crate::store::RevocationStore;
use plight_engine::adapters::{Counter, EventSpec, ADAPTERS};
use plight_engine::{matrix, EthRpc, LogFetcher, NopObserver};
use plight_telemetry::revocation_metrics;
use plight_types::address::Address;
use plight_types::error::{AggregationError, RevocationError};
use plight_types::protocol::{Primitive, Protocol};
use plight_types::revocation::{now_rfc3339, RevocationState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// An event whose occurrence anywhere on the chain moves the revocation cutoff.
#[derive(Debug, Clone)]
pub struct DisqualifyingEvent {
    /// The emitting protocol.
    pub protocol: Protocol,
    /// The event definition.
    pub event: &'static EventSpec,
    /// The emitting contract, or `None` when the event comes from many contracts.
    pub address: Option<Address>,
}

/// The liquidation events of every lending protocol deployed on `chain_id`.
pub fn disqualifying_events(chain_id: u64) -> Result<Vec<DisqualifyingEvent>, AggregationError> {
    let mut out = Vec::new();
    for spec in ADAPTERS
        .iter()
        .filter(|a| matrix::is_applicable(Primitive::Lending, a.protocol, chain_id))
    {
        let resolved = matrix::resolve(spec.protocol, Primitive::Lending, chain_id, spec.contract)?;
        let address = spec.scoped.then_some(resolved);
        out.extend(
            spec.events
                .iter()
                .filter(|e| e.counter == Counter::Liquidation)
                .map(|event| DisqualifyingEvent {
                    protocol: spec.protocol,
                    event,
                    address,
                }),
        );
    }
    Ok(out)
}

/// Scans one chain and maintains its revocation state.
pub struct RevocationTracker {
    chain_id: u64,
    rpc: Arc<dyn EthRpc>,
    store: Arc<RevocationStore>,
    fetcher: LogFetcher,
    events: Vec<DisqualifyingEvent>,
}

impl RevocationTracker {
    /// Creates a tracker for `chain_id` watching its disqualifying events.
    pub fn new(
        chain_id: u64,
        rpc: Arc<dyn EthRpc>,
        store: Arc<RevocationStore>,
        fetcher: LogFetcher,
    ) -> Result<Self, RevocationError> {
        let events =
            disqualifying_events(chain_id).map_err(|e| RevocationError::Config(e.to_string()))?;
        if events.is_empty() {
            tracing::warn!(
                target: "revocation",
                chain_id,
                "no disqualifying events configured; scans will only advance the cursor"
            );
        }
        Ok(Self {
            chain_id,
            rpc,
            store,
            fetcher,
            events,
        })
    }

    /// Replaces the watched events.
    pub fn with_events(mut self, events: Vec<DisqualifyingEvent>) -> Self {
        self.events = events;
        self
    }

    /// The chain being tracked.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Runs one scan of at most `max_blocks + 1` blocks and returns the resulting state.
    pub async fn scan(&self, max_blocks: u64) -> Result<RevocationState, RevocationError> {
        let result = self.scan_inner(max_blocks).await;
        let outcome = match &result {
            Ok((_, true)) => "success",
            Ok((_, false)) => "noop",
            Err(_) => "failure",
        };
        revocation_metrics().inc_scans(outcome);
        result.map(|(state, _)| state)
    }

    async fn scan_inner(&self, max_blocks: u64) -> Result<(RevocationState, bool), RevocationError> {
        let state = self.store.load(self.chain_id)?;
        let head = self.rpc.block_number().await?;
        let from = state.last_scanned_block.saturating_add(1);
        let to = from.saturating_add(max_blocks).min(head);
        if from > to {
            tracing::debug!(target: "revocation", chain_id = self.chain_id, head, "nothing to scan");
            return Ok((state, false));
        }
        tracing::info!(target: "revocation", chain_id = self.chain_id, from, to, "scanning");

        let mut cutoff = state.revocation_cutoff_block;
        for ev in &self.events {
            let topics = [Some(ev.event.topic0())];
            let logs = self
                .fetcher
                .fetch_logs(
                    self.rpc.as_ref(),
                    ev.address,
                    &topics,
                    from,
                    to,
                    self.fetcher.chunk_size(),
                    &NopObserver,
                )
                .await
                .map_err(|e| {
                    tracing::error!(
                        target: "revocation",
                        protocol = %ev.protocol,
                        event = ev.event.name,
                        error = %e,
                        "scan failed; state not advanced"
                    );
                    e
                })?;
            if let Some(max) = logs.iter().map(|l| l.block_number).max() {
                tracing::info!(
                    target: "revocation",
                    protocol = %ev.protocol,
                    event = ev.event.name,
                    count = logs.len(),
                    block = max,
                    "disqualifying events observed"
                );
                cutoff = cutoff.max(max);
            }
        }

        let next = RevocationState {
            revocation_cutoff_block: cutoff,
            last_scanned_block: to,
            produced_at: now_rfc3339(),
            ..state
        };
        self.store.save(&next)?;
        tracing::info!(
            target: "revocation",
            chain_id = self.chain_id,
            cutoff = next.revocation_cutoff_block,
            last_scanned = next.last_scanned_block,
            "scan complete"
        );
        Ok((next, true))
    }

    /// Scans every `interval` until `shutdown` flips to `true`.
    ///
    /// Integrity failures of the store end the loop with an error; anything else
    /// is logged and retried on the next tick.
    pub async fn run(
        &self,
        interval: Duration,
        max_blocks: u64,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), RevocationError> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!(target: "revocation", "tracker stopping");
                        return Ok(());
                    }
                    continue;
                }
            }
            match self.scan(max_blocks).await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    tracing::error!(target: "revocation", error = %e, "fatal revocation error");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(target: "revocation", error = %e, "scan failed; retrying next tick");
                }
            }
        }
    }
}
