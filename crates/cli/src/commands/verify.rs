// Path: crates/cli/src/commands/verify.rs

use super::WindowArgs;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use plight_engine::AggregationEngine;
use plight_notary::VerificationService;
use plight_types::config::PlightConfig;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// File holding the claimed payload JSON, or `-` for stdin.
    #[clap(long)]
    pub payload: PathBuf,

    #[clap(flatten)]
    pub window: WindowArgs,
}

fn read_payload(path: &PathBuf) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read payload from stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Prints the verification result and exits non-zero unless the payload matched.
pub async fn run(args: VerifyArgs, config: PlightConfig) -> Result<()> {
    let claimed = read_payload(&args.payload)?;
    let engine = AggregationEngine::from_config(Arc::new(config));
    let verifier = VerificationService::new(Arc::new(engine));

    let w = &args.window;
    let result = verifier
        .verify(&claimed, &w.chains, w.start, w.end, &w.subject)
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.verified {
        Ok(())
    } else {
        Err(anyhow!(
            "Verification {}: {}",
            result.outcome.as_str(),
            result.error.as_deref().unwrap_or("payload differs from re-execution")
        ))
    }
}
