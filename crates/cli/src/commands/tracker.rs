// Path: crates/cli/src/commands/tracker.rs

use super::shutdown_on_ctrl_c;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plight_engine::{HttpEthRpc, LogFetcher};
use plight_revocation::{RevocationStore, RevocationTracker};
use plight_telemetry::http::Readiness;
use plight_types::config::PlightConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
pub struct TrackerArgs {
    #[clap(subcommand)]
    pub command: TrackerCommands,
}

#[derive(Subcommand, Debug)]
pub enum TrackerCommands {
    /// Run one scan, print the resulting state and exit.
    Scan(TrackerOpts),
    /// Scan every poll interval until interrupted.
    Run(TrackerOpts),
}

#[derive(clap::Args, Debug)]
pub struct TrackerOpts {
    /// Override `tracker.chain_id`.
    #[clap(long)]
    pub chain: Option<u64>,
    /// Override `tracker.state_dir`.
    #[clap(long)]
    pub state_dir: Option<PathBuf>,
    /// Override `tracker.max_blocks`.
    #[clap(long)]
    pub max_blocks: Option<u64>,
}

struct Resolved {
    tracker: RevocationTracker,
    max_blocks: u64,
}

fn build(opts: &TrackerOpts, config: &PlightConfig) -> Result<Resolved> {
    let chain_id = opts.chain.unwrap_or(config.tracker.chain_id);
    let state_dir = opts
        .state_dir
        .clone()
        .unwrap_or_else(|| config.tracker.state_dir.clone());
    let max_blocks = opts.max_blocks.unwrap_or(config.tracker.max_blocks);

    let url = config.rpc_url(chain_id)?;
    let rpc = HttpEthRpc::new(url, &config.fetcher)?;
    let store = RevocationStore::open(&state_dir)
        .with_context(|| format!("Failed to open state dir {}", state_dir.display()))?;
    let tracker = RevocationTracker::new(
        chain_id,
        Arc::new(rpc),
        Arc::new(store),
        LogFetcher::new(config.fetcher.clone()),
    )?;
    Ok(Resolved {
        tracker,
        max_blocks,
    })
}

pub async fn run(args: TrackerArgs, config: PlightConfig) -> Result<()> {
    match args.command {
        TrackerCommands::Scan(opts) => {
            let r = build(&opts, &config)?;
            let state = r.tracker.scan(r.max_blocks).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        TrackerCommands::Run(opts) => {
            let r = build(&opts, &config)?;
            let shutdown_rx = shutdown_on_ctrl_c();

            if let Some(addr) = config.tracker.metrics_addr.as_deref() {
                let addr: SocketAddr = addr
                    .parse()
                    .with_context(|| format!("Invalid tracker.metrics_addr '{}'", addr))?;
                let readiness = Readiness::default();
                readiness.set(true);
                let rx = shutdown_rx.clone();
                tokio::spawn(async move {
                    if let Err(e) = plight_telemetry::http::run_server(addr, readiness, rx).await {
                        tracing::error!(target: "telemetry", error = %e, "metrics server failed");
                    }
                });
            }

            let interval = Duration::from_secs(config.tracker.poll_interval_secs.max(1));
            r.tracker
                .run(interval, r.max_blocks, shutdown_rx)
                .await
                .context("Revocation tracker stopped on a fatal error")
        }
    }
}
