//! Selective field encryption over the state document tree.
//!
//! The encrypt pass replaces fields whose synthetic path matches a
//! configured pattern with `tfb_` + transit ciphertext; the decrypt pass
//! restores every string carrying the compound `tfb_vault:` prefix. Both
//! passes share the tree walker and are keyed by the owning project.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::errors::BackendError;
use crate::domain::path::CryptoPath;
use crate::domain::walk::{resolve_mut, visit_fields, Segment, Visit};
use crate::ports::SecretTransit;

/// Prefix marking a stored string as ciphertext.
pub const CIPHERTEXT_MARKER: &str = "tfb_";

/// Tag the transit engine puts on its own ciphertexts. Only strings with
/// the compound `tfb_vault:` prefix are treated as encrypted on read;
/// anything else passes through byte-for-byte.
pub const TRANSIT_CIPHERTEXT_TAG: &str = "vault:";

/// Encrypts fields matching the configured path patterns and decrypts
/// fields carrying the ciphertext marker.
pub struct FieldCipher {
    transit: Arc<dyn SecretTransit>,
    patterns: Arc<Vec<CryptoPath>>,
    key: String,
}

impl FieldCipher {
    /// `key` is the transit key name, the tenant's own project identifier.
    pub fn new(
        transit: Arc<dyn SecretTransit>,
        patterns: Arc<Vec<CryptoPath>>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            transit,
            patterns,
            key: key.into(),
        }
    }

    /// Encrypt every field whose path matches a configured pattern, in
    /// place. Patterns are tested in order and the first match wins; a
    /// replaced subtree is not descended into, since its contents no longer
    /// exist. Unmatched fields are left untouched and recursed into.
    pub async fn encrypt(&self, tree: &mut Value) -> Result<(), BackendError> {
        let mut targets: Vec<(String, Vec<Segment>, String)> = Vec::new();
        visit_fields(tree, &mut |path, segments, value| {
            if self.patterns.iter().any(|p| p.matches(path)) {
                targets.push((path.to_string(), segments.to_vec(), scalar_plaintext(value)));
                return Visit::Skip;
            }
            Visit::Descend
        });

        for (path, segments, plaintext) in targets {
            let ciphertext = self.transit.encrypt(&plaintext, &self.key).await?;
            debug!(path = %path, "encrypted field");
            if let Some(slot) = resolve_mut(tree, &segments) {
                *slot = Value::String(format!("{}{}", CIPHERTEXT_MARKER, ciphertext));
            }
        }
        Ok(())
    }

    /// Decrypt every marker-prefixed string, in place. The `tfb_` segment
    /// is stripped before the ciphertext is handed to the transit engine.
    pub async fn decrypt(&self, tree: &mut Value) -> Result<(), BackendError> {
        let compound = format!("{}{}", CIPHERTEXT_MARKER, TRANSIT_CIPHERTEXT_TAG);

        let mut targets: Vec<(Vec<Segment>, String)> = Vec::new();
        visit_fields(tree, &mut |_, segments, value| {
            if let Value::String(s) = value {
                if s.starts_with(&compound) {
                    targets.push((segments.to_vec(), s[CIPHERTEXT_MARKER.len()..].to_string()));
                }
            }
            Visit::Descend
        });

        for (segments, ciphertext) in targets {
            let plaintext = self.transit.decrypt(&ciphertext, &self.key).await?;
            if let Some(slot) = resolve_mut(tree, &segments) {
                *slot = Value::String(plaintext);
            }
        }
        Ok(())
    }
}

/// Plaintext handed to the transit engine for a matched field: strings
/// encrypt as-is, anything else as its JSON rendering.
fn scalar_plaintext(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
