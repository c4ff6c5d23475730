// Path: crates/cli/src/commands/mod.rs

pub mod aggregate;
pub mod keys;
pub mod notary;
pub mod registry;
pub mod tracker;
pub mod verify;

use anyhow::{Context, Result};
use plight_types::config::PlightConfig;
use std::path::PathBuf;
use tokio::sync::watch;

/// Loads the configuration file, or the built-in defaults when none is given.
pub fn load_config(path: Option<PathBuf>) -> Result<PlightConfig> {
    match path {
        Some(path) => PlightConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(PlightConfig::default()),
    }
}

/// A shutdown channel that flips to `true` on Ctrl-C.
pub fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "cli", error = %e, "cannot listen for ctrl-c");
            return;
        }
        tracing::info!(target: "cli", "ctrl-c received, shutting down");
        let _ = tx.send(true);
    });
    rx
}

/// Parsed `--chains`, `--start`, `--end` and `--subject` shared by `aggregate` and `verify`.
#[derive(clap::Args, Debug, Clone)]
pub struct WindowArgs {
    /// Comma-separated chain ids, e.g. `1,137`.
    #[clap(long, value_delimiter = ',', required = true)]
    pub chains: Vec<u64>,
    /// First block of the observation window (inclusive).
    #[clap(long)]
    pub start: u64,
    /// Last block of the observation window (inclusive).
    #[clap(long)]
    pub end: u64,
    /// The subject address (`0x` + 40 hex).
    #[clap(long)]
    pub subject: String,
}
