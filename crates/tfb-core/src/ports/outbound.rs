//! # Outbound Ports (Driven Ports)
//!
//! The external services the state backend requires: an ordered key/value
//! document service and a keyed encrypt/decrypt oracle. The core holds no
//! persistent state of its own; every request is independently constructed
//! against these ports.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::entities::Collections;
use crate::domain::errors::{StoreError, TransitError};

/// Outcome of a create-if-absent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The id was free and the document was created.
    Created,
    /// A document with this id already exists. Not an error: for lock
    /// documents this is the expected "already locked" outcome.
    Conflict,
}

/// Outcome of a keyed delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// No document under this id. Not an error either.
    NotFound,
}

/// The two query shapes the backend issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentQuery {
    /// The single most recent document, ordered by `timestamp` descending.
    LatestByTimestamp,
    /// Every document whose `timestamp` equals the given value. Order among
    /// the results is not meaningful.
    TimestampEquals(String),
}

/// Abstract interface for the ordered key/value document service.
///
/// Production: `ElasticStore` (tfb-runtime/src/adapters/elastic.rs)
/// Testing: `InMemoryDocumentStore` (src/adapters/memory.rs)
///
/// Write visibility for subsequent reads is the store's consistency
/// contract, configured on the adapter, not decided here.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert `body` under `id` only if the id is free.
    async fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> Result<CreateOutcome, StoreError>;

    /// Delete the document keyed by `id`.
    async fn delete(&self, collection: &str, id: &str) -> Result<DeleteOutcome, StoreError>;

    /// Unconditional insert of a new document. Snapshots and resources are
    /// never looked up by id, so none is assigned.
    async fn index(&self, collection: &str, body: &Value) -> Result<(), StoreError>;

    /// Run a query and return the matching document bodies.
    async fn search(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Value>, StoreError>;
}

/// Abstract interface for the keyed encrypt/decrypt oracle.
///
/// Production: `VaultClient` (tfb-runtime/src/adapters/vault.rs)
/// Testing: `InMemoryTransit` (src/adapters/memory.rs)
#[async_trait]
pub trait SecretTransit: Send + Sync {
    /// Encrypt `plaintext` under the named key, returning the engine's
    /// tagged ciphertext.
    async fn encrypt(&self, plaintext: &str, key: &str) -> Result<String, TransitError>;

    /// Decrypt a tagged ciphertext under the named key.
    async fn decrypt(&self, ciphertext: &str, key: &str) -> Result<String, TransitError>;
}

/// A project's document store together with the collections its documents
/// live in.
#[derive(Clone)]
pub struct ProjectStore {
    pub store: Arc<dyn DocumentStore>,
    pub collections: Collections,
}

/// Resolves a project identifier to its document store.
///
/// Production: `ElasticProvider`, which reads per-project settings from the
/// secret store on each open. Testing: `InMemoryProvider`.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn open(&self, project: &str) -> Result<ProjectStore, StoreError>;
}
