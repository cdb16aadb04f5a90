//! In-memory adapters for unit tests.
//!
//! `InMemoryDocumentStore` keeps keyed documents (create-if-absent, delete)
//! and appended documents (index, search) per collection, with an
//! injectable transport failure for error-path tests. `InMemoryTransit` is
//! a reversible fake of the transit engine whose ciphertexts carry the real
//! engine's tag and bind the key name.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::domain::cipher::TRANSIT_CIPHERTEXT_TAG;
use crate::domain::entities::{Collections, TIMESTAMP_FIELD};
use crate::domain::errors::{StoreError, TransitError};
use crate::ports::{
    CreateOutcome, DeleteOutcome, DocumentQuery, DocumentStore, ProjectStore, SecretTransit,
    StoreProvider,
};

#[derive(Default)]
struct MemCollection {
    keyed: HashMap<String, Value>,
    docs: Vec<Value>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, MemCollection>,
    fail: bool,
}

/// In-memory document store.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a transport error.
    pub fn set_failing(&self, fail: bool) {
        self.inner.lock().fail = fail;
    }

    /// Documents indexed into `collection`, in insertion order.
    pub fn indexed(&self, collection: &str) -> Vec<Value> {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map(|c| c.docs.clone())
            .unwrap_or_default()
    }

    /// The keyed document under `id`, if present.
    pub fn keyed(&self, collection: &str, id: &str) -> Option<Value> {
        self.inner
            .lock()
            .collections
            .get(collection)
            .and_then(|c| c.keyed.get(id).cloned())
    }

    fn check(inner: &Inner) -> Result<(), StoreError> {
        if inner.fail {
            Err(StoreError::new("injected store failure"))
        } else {
            Ok(())
        }
    }
}

fn timestamp_of(doc: &Value) -> Option<&str> {
    doc.get(TIMESTAMP_FIELD)?.as_str()
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> Result<CreateOutcome, StoreError> {
        let mut inner = self.inner.lock();
        Self::check(&inner)?;
        let col = inner.collections.entry(collection.to_string()).or_default();
        if col.keyed.contains_key(id) {
            return Ok(CreateOutcome::Conflict);
        }
        col.keyed.insert(id.to_string(), body.clone());
        Ok(CreateOutcome::Created)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<DeleteOutcome, StoreError> {
        let mut inner = self.inner.lock();
        Self::check(&inner)?;
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|c| c.keyed.remove(id));
        Ok(match removed {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    async fn index(&self, collection: &str, body: &Value) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        Self::check(&inner)?;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .docs
            .push(body.clone());
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Value>, StoreError> {
        let inner = self.inner.lock();
        Self::check(&inner)?;
        let docs = match inner.collections.get(collection) {
            Some(col) => &col.docs,
            None => return Ok(Vec::new()),
        };
        Ok(match query {
            DocumentQuery::LatestByTimestamp => docs
                .iter()
                .enumerate()
                // Later insertion wins a timestamp tie, like a desc sort
                // over a store that keeps insertion order.
                .max_by_key(|(i, doc)| (timestamp_of(doc).map(str::to_string), *i))
                .map(|(_, doc)| vec![doc.clone()])
                .unwrap_or_default(),
            DocumentQuery::TimestampEquals(ts) => docs
                .iter()
                .filter(|doc| timestamp_of(doc) == Some(ts.as_str()))
                .cloned()
                .collect(),
        })
    }
}

/// Reversible fake transit engine. Ciphertexts carry the engine tag and
/// bind the key name, so decrypting under the wrong key fails the way the
/// real engine does.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTransit;

#[async_trait]
impl SecretTransit for InMemoryTransit {
    async fn encrypt(&self, plaintext: &str, key: &str) -> Result<String, TransitError> {
        Ok(format!(
            "{}v1:{}",
            TRANSIT_CIPHERTEXT_TAG,
            hex::encode(format!("{}:{}", key, plaintext))
        ))
    }

    async fn decrypt(&self, ciphertext: &str, key: &str) -> Result<String, TransitError> {
        let tagged = format!("{}v1:", TRANSIT_CIPHERTEXT_TAG);
        let encoded = ciphertext
            .strip_prefix(&tagged)
            .ok_or_else(|| TransitError::new("unrecognized ciphertext framing"))?;
        let bytes = hex::decode(encoded)
            .map_err(|e| TransitError::new(format!("invalid ciphertext: {}", e)))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| TransitError::new("ciphertext payload is not utf-8"))?;
        let (bound_key, plaintext) = text
            .split_once(':')
            .ok_or_else(|| TransitError::new("ciphertext missing key binding"))?;
        if bound_key != key {
            return Err(TransitError::new(format!(
                "ciphertext is bound to key {}",
                bound_key
            )));
        }
        Ok(plaintext.to_string())
    }
}

/// Provider handing every project the same shared in-memory store with the
/// default collection names.
pub struct InMemoryProvider {
    store: Arc<InMemoryDocumentStore>,
    collections: Collections,
}

impl InMemoryProvider {
    pub fn new(store: Arc<InMemoryDocumentStore>) -> Self {
        Self {
            store,
            collections: Collections::default(),
        }
    }
}

#[async_trait]
impl StoreProvider for InMemoryProvider {
    async fn open(&self, _project: &str) -> Result<ProjectStore, StoreError> {
        let store: Arc<dyn DocumentStore> = self.store.clone();
        Ok(ProjectStore {
            store,
            collections: self.collections.clone(),
        })
    }
}
