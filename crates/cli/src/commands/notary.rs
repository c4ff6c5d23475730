// Path: crates/cli/src/commands/notary.rs

use super::shutdown_on_ctrl_c;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use plight_crypto::{key_store, NotaryKeyPair};
use plight_engine::AggregationEngine;
use plight_notary::{AttestationIssuer, VerificationService};
use plight_types::config::{MismatchPolicy, PlightConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct NotaryArgs {
    /// Read the signing key from this file instead of the environment.
    #[clap(long)]
    pub key_file: Option<PathBuf>,

    /// Override `notary.listen_addr`.
    #[clap(long)]
    pub listen: Option<String>,

    /// Refuse to attest when the client payload differs from the re-execution.
    #[clap(long)]
    pub strict: bool,
}

/// Loads the notary key from `key_file`, or from the environment variable `env_var`.
pub fn load_keypair(key_file: Option<&PathBuf>, env_var: &str) -> Result<NotaryKeyPair> {
    match key_file {
        Some(path) => key_store::load_from_file(path)
            .with_context(|| format!("Failed to load key file {}", path.display())),
        None => key_store::load_from_env(env_var)
            .with_context(|| format!("Invalid key in ${}", env_var))?
            .ok_or_else(|| anyhow!("No signing key: set ${} or pass --key-file", env_var)),
    }
}

pub async fn run(args: NotaryArgs, config: PlightConfig) -> Result<()> {
    let mut notary_config = config.notary.clone();
    if let Some(listen) = args.listen {
        notary_config.listen_addr = listen;
    }
    if args.strict {
        notary_config.mismatch_policy = MismatchPolicy::Strict;
    }

    let keypair = load_keypair(args.key_file.as_ref(), &notary_config.private_key_env)?;
    let engine = AggregationEngine::from_config(Arc::new(config));
    let issuer = AttestationIssuer::new(
        VerificationService::new(Arc::new(engine)),
        Arc::new(keypair),
        &notary_config,
    )?;

    let shutdown_rx = shutdown_on_ctrl_c();
    plight_notary::server::run_server(notary_config, Arc::new(issuer), shutdown_rx).await
}
