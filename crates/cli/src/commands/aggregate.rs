// Path: crates/cli/src/commands/aggregate.rs

use super::WindowArgs;
use anyhow::{Context, Result};
use clap::Parser;
use plight_engine::{AggregationEngine, Aggregator, NopObserver};
use plight_types::config::PlightConfig;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct AggregateArgs {
    #[clap(flatten)]
    pub window: WindowArgs,

    /// Suppress per-adapter progress logs.
    #[clap(long)]
    pub quiet: bool,
}

pub async fn run(args: AggregateArgs, config: PlightConfig) -> Result<()> {
    let mut engine = AggregationEngine::from_config(Arc::new(config));
    if args.quiet {
        engine = engine.with_observer(Arc::new(NopObserver));
    }
    let w = &args.window;
    let json = engine
        .aggregate(&w.chains, w.start, w.end, &w.subject)
        .await
        .context("Aggregation failed")?;
    println!("{}", json);
    Ok(())
}
