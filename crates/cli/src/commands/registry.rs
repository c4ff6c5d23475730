// Path: crates/cli/src/commands/registry.rs

use super::shutdown_on_ctrl_c;
use anyhow::Result;
use clap::Parser;
use plight_revocation::RevocationRegistry;
use plight_types::config::PlightConfig;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct RegistryArgs {
    /// Override `registry.listen_addr`.
    #[clap(long)]
    pub listen: Option<String>,
}

pub async fn run(args: RegistryArgs, config: PlightConfig) -> Result<()> {
    let mut registry_config = config.registry;
    if let Some(listen) = args.listen {
        registry_config.listen_addr = listen;
    }
    let admin_token = std::env::var(&registry_config.admin_token_env)
        .ok()
        .filter(|t| !t.is_empty());
    if admin_token.is_none() {
        tracing::info!(
            target: "registry",
            env = %registry_config.admin_token_env,
            "no admin token configured, POST /revoke disabled"
        );
    }

    let shutdown_rx = shutdown_on_ctrl_c();
    plight_revocation::server::run_server(
        registry_config,
        Arc::new(RevocationRegistry::new()),
        admin_token,
        shutdown_rx,
    )
    .await
}
