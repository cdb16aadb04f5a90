//! Dependency wiring for the runtime.
//!
//! Everything is constructed once at startup and injected through
//! constructors; no component reaches into an ambient scope for its
//! collaborators.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use tfb_core::{SecretTransit, StoreProvider};
use tfb_gateway::{AppState, BackendConfig, CredentialVerifier, GatewayService};

use crate::adapters::elastic::ElasticProvider;
use crate::adapters::vault::VaultClient;

/// The assembled application.
pub struct AppContext {
    pub gateway: GatewayService,
}

impl AppContext {
    /// Build the full object graph from configuration.
    pub fn build(mut config: BackendConfig) -> Result<Self> {
        if let Ok(token) = std::env::var("VAULT_TOKEN") {
            config.vault.token = Some(token);
        }

        let vault_ca = read_optional_pem(config.vault.ca_cert_path.as_deref())
            .context("reading vault CA certificate")?;
        let elastic_ca = read_optional_pem(config.elasticsearch.ca_cert_path.as_deref())
            .context("reading elasticsearch CA certificate")?;

        let vault = Arc::new(
            VaultClient::connect(&config.vault, vault_ca.as_deref())
                .context("building vault client")?,
        );
        info!(address = %config.vault.address, "vault client ready");

        let provider: Arc<dyn StoreProvider> =
            Arc::new(ElasticProvider::new(Arc::clone(&vault), elastic_ca));
        let transit: Arc<dyn SecretTransit> = vault.clone();
        let verifier: Arc<dyn CredentialVerifier> = vault;

        let patterns = config
            .compile_patterns()
            .context("compiling encrypt patterns")?;
        info!(patterns = patterns.len(), "encrypt patterns compiled");

        let state = AppState::new(provider, transit, patterns);
        let gateway =
            GatewayService::new(config, state, verifier).context("building gateway")?;

        Ok(Self { gateway })
    }
}

fn read_optional_pem(path: Option<&str>) -> Result<Option<Vec<u8>>> {
    match path {
        Some(path) => {
            let pem = std::fs::read(path).with_context(|| format!("reading {}", path))?;
            Ok(Some(pem))
        }
        None => Ok(None),
    }
}
