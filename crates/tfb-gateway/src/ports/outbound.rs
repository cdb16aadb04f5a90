//! Outbound ports for the gateway.

use std::collections::HashMap;

use async_trait::async_trait;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Credential verification could not be completed: the backing service was
/// unreachable or answered with an unexpected shape. A clean rejection is
/// `Ok(false)` on the port, not this error.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Verifies Basic-Authentication credentials.
///
/// Production: `VaultClient` userpass login (tfb-runtime/src/adapters/vault.rs)
/// Testing: `StaticCredentials` (below)
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> Result<bool, AuthError>;
}

/// Fixed username/password table with constant-time password comparison,
/// for unit tests.
#[derive(Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let Some(expected) = self.users.get(username) else {
            return Ok(false);
        };
        Ok(constant_time_compare(password, expected))
    }
}

/// Constant-time string comparison.
///
/// Both inputs are padded to the longer length (with different pad bytes,
/// so unequal lengths cannot compare equal) and the length check itself is
/// constant time.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let max_len = std::cmp::max(a.len(), b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}
