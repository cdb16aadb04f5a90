//! Vault adapter: transit encrypt/decrypt, userpass credential checks, and
//! KV2 reads for per-project settings.
//!
//! One client with a service token is built at startup; Basic-Auth requests
//! only verify credentials through a userpass login and never carry their
//! own token into transit or KV calls.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Certificate, Client, StatusCode};
use serde_json::{json, Value};
use tracing::warn;

use tfb_core::{SecretTransit, StoreError, TransitError};
use tfb_gateway::config::VaultConfig;
use tfb_gateway::{AuthError, CredentialVerifier};

/// Client for the Vault HTTP API.
pub struct VaultClient {
    http: Client,
    address: String,
    userpass_path: String,
    kv_mount_path: String,
    transit_path: String,
    token: Option<String>,
}

impl VaultClient {
    /// Build a client from configuration. `ca_pem` is the trust anchor for
    /// a https Vault address signed by a private CA.
    pub fn connect(config: &VaultConfig, ca_pem: Option<&[u8]>) -> Result<Self, TransitError> {
        let mut builder = Client::builder();
        if let Some(pem) = ca_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| TransitError::new(format!("invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder
            .build()
            .map_err(|e| TransitError::new(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            address: config.address.trim_end_matches('/').to_string(),
            userpass_path: config.userpass_path.clone(),
            kv_mount_path: config.kv_mount_path.clone(),
            transit_path: config.transit_path.clone(),
            token: config.token.clone(),
        })
    }

    fn token(&self) -> Result<&str, TransitError> {
        self.token
            .as_deref()
            .ok_or_else(|| TransitError::new("no vault token configured"))
    }

    /// Write to a logical path with the service token and return the
    /// response body.
    async fn logical_write(&self, path: &str, body: Value) -> Result<Value, TransitError> {
        let token = self.token()?;
        let url = format!("{}/v1/{}", self.address, path);
        let response = self
            .http
            .post(url)
            .header("X-Vault-Token", token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransitError::new(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransitError::new(format!(
                "vault write to {} returned {}",
                path,
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| TransitError::new(e.to_string()))
    }

    /// Read a KV v2 secret. `Ok(None)` when no secret exists at the path.
    pub async fn read_kv2(&self, secret_path: &str) -> Result<Option<Value>, StoreError> {
        let token = self.token().map_err(|e| StoreError::new(e.to_string()))?;
        let url = format!(
            "{}/v1/{}/data/{}",
            self.address, self.kv_mount_path, secret_path
        );
        let response = self
            .http
            .get(url)
            .header("X-Vault-Token", token)
            .send()
            .await
            .map_err(|e| StoreError::new(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::new(format!(
                "vault kv read returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::new(e.to_string()))?;
        Ok(kv2_data_from(body))
    }
}

/// The secret payload of a KV v2 read response. KV v2 wraps the user data
/// twice: `data.data`.
fn kv2_data_from(response: Value) -> Option<Value> {
    match response.get("data")?.get("data") {
        Some(data) if data.is_object() => Some(data.clone()),
        _ => None,
    }
}

/// The ciphertext field of a transit encrypt response.
fn ciphertext_from(response: &Value) -> Result<String, TransitError> {
    response["data"]["ciphertext"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TransitError::new("no ciphertext in vault response"))
}

/// The decoded plaintext of a transit decrypt response. Transit frames
/// plaintext in base64.
fn plaintext_from(response: &Value) -> Result<String, TransitError> {
    let encoded = response["data"]["plaintext"]
        .as_str()
        .ok_or_else(|| TransitError::new("no plaintext in vault response"))?;
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| TransitError::new(format!("failed to decode plaintext: {}", e)))?;
    String::from_utf8(bytes).map_err(|_| TransitError::new("plaintext is not utf-8"))
}

#[async_trait]
impl SecretTransit for VaultClient {
    async fn encrypt(&self, plaintext: &str, key: &str) -> Result<String, TransitError> {
        let path = format!("{}/encrypt/{}", self.transit_path, key);
        let body = json!({ "plaintext": BASE64.encode(plaintext) });
        let response = self.logical_write(&path, body).await?;
        ciphertext_from(&response)
    }

    async fn decrypt(&self, ciphertext: &str, key: &str) -> Result<String, TransitError> {
        let path = format!("{}/decrypt/{}", self.transit_path, key);
        let body = json!({ "ciphertext": ciphertext });
        let response = self.logical_write(&path, body).await?;
        plaintext_from(&response)
    }
}

#[async_trait]
impl CredentialVerifier for VaultClient {
    /// Verify credentials by attempting a userpass login. The token a
    /// successful login returns is discarded.
    async fn verify(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let url = format!(
            "{}/v1/auth/{}/login/{}",
            self.address, self.userpass_path, username
        );
        let response = self
            .http
            .post(url)
            .json(&json!({ "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::new(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN => {
                warn!(user = %username, "userpass login rejected");
                Ok(false)
            }
            status => Err(AuthError::new(format!(
                "userpass login returned {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv2_payload_is_unwrapped_twice() {
        let response = json!({
            "data": {
                "data": { "addresses": "http://es:9200" },
                "metadata": { "version": 3 }
            }
        });
        let data = kv2_data_from(response).unwrap();
        assert_eq!(data["addresses"], "http://es:9200");
    }

    #[test]
    fn kv2_payload_without_data_is_none() {
        assert!(kv2_data_from(json!({})).is_none());
        assert!(kv2_data_from(json!({"data": {}})).is_none());
        assert!(kv2_data_from(json!({"data": {"data": "not an object"}})).is_none());
    }

    #[test]
    fn ciphertext_is_read_from_the_transit_response() {
        let response = json!({ "data": { "ciphertext": "vault:v1:abc123" } });
        assert_eq!(ciphertext_from(&response).unwrap(), "vault:v1:abc123");

        let empty = json!({ "data": {} });
        assert!(ciphertext_from(&empty).is_err());
    }

    #[test]
    fn plaintext_is_base64_decoded() {
        let response = json!({ "data": { "plaintext": BASE64.encode("mysecret") } });
        assert_eq!(plaintext_from(&response).unwrap(), "mysecret");
    }

    #[test]
    fn garbled_plaintext_is_a_transit_error() {
        let response = json!({ "data": { "plaintext": "!!! not base64 !!!" } });
        assert!(plaintext_from(&response).is_err());
    }

    #[test]
    fn missing_token_fails_before_any_network_call() {
        let client = VaultClient::connect(&VaultConfig::default(), None).unwrap();
        assert!(client.token().is_err());
    }
}
