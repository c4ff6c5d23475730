// Path: crates/cli/src/main.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # plight CLI
//!
//! One binary for every plight role: offline aggregation and verification, the
//! notary and registry services, the revocation tracker, and notary key handling.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::*;

#[derive(Parser, Debug)]
#[clap(
    name = "plight",
    version,
    about = "The plight CLI (aggregation, attestation and revocation).",
    long_about = "Aggregates on-chain behavior into canonical JSON, verifies client claims, and runs the notary, revocation registry and revocation tracker."
)]
struct Cli {
    /// Path to a `plight.toml` configuration file. Built-in defaults apply when omitted.
    #[clap(long, global = true, env = "PLIGHT_CONFIG")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // --- Offline ---
    /// Aggregate a subject's activity and print the canonical JSON document.
    Aggregate(aggregate::AggregateArgs),

    /// Re-execute an aggregation and compare it with a claimed payload.
    Verify(verify::VerifyArgs),

    // --- Services ---
    /// Run the attestation notary (`POST /attest`).
    Notary(notary::NotaryArgs),

    /// Run the revocation registry (`GET /revoked`).
    Registry(registry::RegistryArgs),

    /// Scan for disqualifying events and maintain the revocation cutoff.
    Tracker(tracker::TrackerArgs),

    // --- Tools ---
    /// Manage the notary signing key.
    Keys(keys::KeysArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    plight_telemetry::init::init_tracing("info")?;
    let sink = plight_telemetry::prometheus::install()?;
    if plight_telemetry::sinks::SINK.set(sink).is_err() {
        tracing::warn!(target: "cli", "metrics sink already installed");
    }

    match cli.command {
        // --- Keys ---
        Commands::Keys(args) => keys::run(args),

        // --- Offline ---
        Commands::Aggregate(args) => aggregate::run(args, load_config(cli.config)?).await,
        Commands::Verify(args) => verify::run(args, load_config(cli.config)?).await,

        // --- Services ---
        Commands::Notary(args) => notary::run(args, load_config(cli.config)?).await,
        Commands::Registry(args) => registry::run(args, load_config(cli.config)?).await,
        Commands::Tracker(args) => tracker::run(args, load_config(cli.config)?).await,
    }
}
