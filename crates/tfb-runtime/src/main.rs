//! # tf-backend Server
//!
//! The server binary for the infrastructure-as-code state backend.
//!
//! ## Startup Sequence
//!
//! 1. Parse command-line flags
//! 2. Initialize the tracing subscriber (env-filter, `info` by default)
//! 3. Load the YAML configuration (missing file falls back to defaults)
//! 4. Build the adapter graph: Vault client, per-project store provider
//! 5. Serve the protocol route until interrupted

pub mod adapters;
pub mod container;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tfb_gateway::BackendConfig;

use crate::container::AppContext;

/// Remote backend for infrastructure-as-code state.
#[derive(Debug, Parser)]
#[command(name = "tfb-server", version, about)]
struct Args {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(path = %args.config.display(), "using configuration file");
    let config = BackendConfig::load(&args.config)?;

    let context = AppContext::build(config)?;
    context.gateway.serve().await?;

    Ok(())
}
