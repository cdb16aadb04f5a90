//! Gateway configuration with validation.
//!
//! Loaded from a YAML file; a missing file falls back to defaults so a
//! fresh checkout runs against local services without any setup.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tfb_core::CryptoPath;

/// Main backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// HTTP server configuration.
    pub http_server: HttpServerConfig,
    /// Document-store client configuration.
    pub elasticsearch: ElasticsearchConfig,
    /// Secret-store client configuration.
    pub vault: VaultConfig,
    /// Path patterns selecting fields for encryption, tested in order.
    pub encrypt: Vec<String>,
}

impl BackendConfig {
    /// Read the configuration from `path`. A missing file is not an error:
    /// defaults apply.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "configuration file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e.to_string())),
        };

        let config: Self =
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes cannot be 0".to_string(),
            ));
        }
        if self.http_server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs cannot be 0".to_string(),
            ));
        }
        self.compile_patterns()?;
        Ok(())
    }

    /// Compile the configured encryption patterns, preserving order.
    pub fn compile_patterns(&self) -> Result<Vec<CryptoPath>, ConfigError> {
        CryptoPath::compile_all(&self.encrypt).map_err(|e| ConfigError::Pattern(e.to_string()))
    }
}

/// HTTP server configuration. TLS termination is left to a fronting proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    /// Bind address.
    pub host: IpAddr,
    /// Port (default: 8080).
    pub port: u16,
    /// Max request body size in bytes. State documents can be large.
    pub max_body_bytes: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            max_body_bytes: 32 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

impl HttpServerConfig {
    /// The server bind address.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Document-store client configuration. Per-project addresses, credentials,
/// and collection names come from the secret store; only the trust anchor
/// lives in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    /// Path to the CA certificate for https cluster addresses.
    pub ca_cert_path: Option<String>,
}

/// Secret-store client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Base URL of the Vault server.
    pub address: String,
    /// Path to the CA certificate for a https Vault address.
    pub ca_cert_path: Option<String>,
    /// Mount path of the userpass authentication backend.
    pub userpass_path: String,
    /// Mount path of the KV v2 engine holding per-project settings.
    pub kv_mount_path: String,
    /// Mount path of the transit engine.
    pub transit_path: String,
    /// Service token for transit and KV reads. The `VAULT_TOKEN`
    /// environment variable overrides this at startup.
    pub token: Option<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:8200".to_string(),
            ca_cert_path: None,
            userpass_path: "userpass".to_string(),
            kv_mount_path: "kv".to_string(),
            transit_path: "transit".to_string(),
            token: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(String),
    /// The configuration file is not valid YAML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    /// An encryption pattern does not compile.
    #[error("invalid encrypt pattern: {0}")]
    Pattern(String),
    /// General configuration error.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = BackendConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http_server.port, 8080);
        assert_eq!(config.vault.address, "http://localhost:8200");
        assert_eq!(config.vault.userpass_path, "userpass");
        assert!(config.encrypt.is_empty());
    }

    #[test]
    fn parses_a_partial_yaml_file() {
        let yaml = r#"
http_server:
  port: 9090
vault:
  address: https://vault.internal:8200
  transit_path: tf-transit
encrypt:
  - "\\.secret_key"
  - "password"
"#;
        let config: BackendConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.http_server.port, 9090);
        // Unset sections keep their defaults.
        assert_eq!(config.http_server.max_body_bytes, 32 * 1024 * 1024);
        assert_eq!(config.vault.address, "https://vault.internal:8200");
        assert_eq!(config.vault.transit_path, "tf-transit");
        assert_eq!(config.vault.kv_mount_path, "kv");
        assert_eq!(config.encrypt.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_pattern_fails_validation() {
        let config = BackendConfig {
            encrypt: vec!["[unclosed".to_string()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Pattern(_))));
    }

    #[test]
    fn zero_body_limit_fails_validation() {
        let mut config = BackendConfig::default();
        config.http_server.max_body_bytes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = BackendConfig::load(Path::new("/nonexistent/config.yaml")).unwrap();
        assert_eq!(config.http_server.port, 8080);
    }
}
