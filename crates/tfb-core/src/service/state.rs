//! Snapshot storage and retrieval with resource splitting.
//!
//! A write encrypts the tree, splits the `resources` array into individual
//! documents stamped with one shared timestamp, then writes the remaining
//! snapshot document. A read finds the snapshot with the maximum timestamp,
//! rejoins the resources stamped with it, and decrypts.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::info;

use crate::domain::cipher::FieldCipher;
use crate::domain::entities::{Collections, RESOURCES_FIELD, TIMESTAMP_FIELD};
use crate::domain::errors::BackendError;
use crate::ports::{DocumentQuery, DocumentStore};

/// Orchestrates snapshot write/read and resource splitting/joining, with
/// the field cipher applied at the store/load boundary. Holds no state of
/// its own; construction per request is cheap.
pub struct StateRepository {
    store: Arc<dyn DocumentStore>,
    collections: Collections,
    cipher: FieldCipher,
    project: String,
}

impl StateRepository {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collections: Collections,
        cipher: FieldCipher,
        project: impl Into<String>,
    ) -> Self {
        Self {
            store,
            collections,
            cipher,
            project: project.into(),
        }
    }

    /// Store a new snapshot from the raw request body.
    ///
    /// Resources are written before the snapshot and the snapshot write is
    /// the commit point: a failure partway through leaves resource
    /// documents whose timestamp no snapshot carries, which the read join
    /// never sees. There is no rollback.
    pub async fn store_snapshot(&self, raw: &[u8]) -> Result<(), BackendError> {
        let mut tree: Value = serde_json::from_slice(raw)
            .map_err(|e| BackendError::MalformedInput(format!("invalid JSON: {}", e)))?;

        self.cipher.encrypt(&mut tree).await?;

        let Value::Object(mut snapshot) = tree else {
            return Err(BackendError::MalformedInput(
                "state is not a JSON object".to_string(),
            ));
        };

        let resources = match snapshot.remove(RESOURCES_FIELD) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(BackendError::MalformedInput(
                    "state has no resources array".to_string(),
                ))
            }
        };

        // Captured once: the snapshot and every resource in this write
        // share it, and it is the join key on read.
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        for resource in resources {
            let Value::Object(mut fields) = resource else {
                return Err(BackendError::MalformedInput(
                    "resource is not a JSON object".to_string(),
                ));
            };
            fields.insert(TIMESTAMP_FIELD.to_string(), Value::String(now.clone()));
            self.store
                .index(&self.collections.resources, &Value::Object(fields))
                .await?;
        }

        snapshot.insert(TIMESTAMP_FIELD.to_string(), Value::String(now.clone()));
        self.store
            .index(&self.collections.snapshots, &Value::Object(snapshot))
            .await?;

        info!(project = %self.project, timestamp = %now, "stored state snapshot");
        Ok(())
    }

    /// Load the most recent snapshot with its resources rejoined under
    /// `resources`. Resource order is not meaningful.
    pub async fn load_latest(&self) -> Result<Value, BackendError> {
        let hits = self
            .store
            .search(&self.collections.snapshots, &DocumentQuery::LatestByTimestamp)
            .await?;
        let mut snapshot = hits.into_iter().next().ok_or(BackendError::NotFound)?;

        let timestamp = snapshot
            .get(TIMESTAMP_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BackendError::MalformedInput("stored snapshot has no timestamp".to_string())
            })?
            .to_string();

        let resources = self
            .store
            .search(
                &self.collections.resources,
                &DocumentQuery::TimestampEquals(timestamp.clone()),
            )
            .await?;

        match &mut snapshot {
            Value::Object(map) => {
                map.insert(RESOURCES_FIELD.to_string(), Value::Array(resources));
            }
            _ => {
                return Err(BackendError::MalformedInput(
                    "stored snapshot is not a JSON object".to_string(),
                ))
            }
        }

        self.cipher.decrypt(&mut snapshot).await?;

        info!(project = %self.project, timestamp = %timestamp, "loaded state snapshot");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryDocumentStore, InMemoryTransit};
    use crate::domain::path::CryptoPath;
    use serde_json::json;

    fn repository(store: Arc<InMemoryDocumentStore>, patterns: &[&str]) -> StateRepository {
        let cipher = FieldCipher::new(
            Arc::new(InMemoryTransit::default()),
            Arc::new(CryptoPath::compile_all(patterns).unwrap()),
            "test-project",
        );
        StateRepository::new(store, Collections::default(), cipher, "test-project")
    }

    #[tokio::test]
    async fn round_trip_preserves_unmatched_snapshots() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = repository(store.clone(), &[]);

        repo.store_snapshot(br#"{"version": 4, "serial": 11, "resources": [{"id": "i-1"}]}"#)
            .await
            .unwrap();

        let merged = repo.load_latest().await.unwrap();
        assert_eq!(merged["version"], 4);
        assert_eq!(merged["serial"], 11);
        assert!(merged["timestamp"].is_string());
        let resources = merged["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["id"], "i-1");
    }

    #[tokio::test]
    async fn stores_the_concrete_scenario_shape() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = repository(store.clone(), &[r"^\.secret_key$"]);

        repo.store_snapshot(
            br#"{"resources":[{"type":"aws_instance","id":"i-1"}],"secret_key":"mysecret"}"#,
        )
        .await
        .unwrap();

        // The resource document carries the shared timestamp.
        let resources = store.indexed("terraform-resources");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["type"], "aws_instance");
        assert_eq!(resources[0]["id"], "i-1");
        let resource_ts = resources[0]["timestamp"].as_str().unwrap().to_string();

        // The snapshot document has no resources and a masked secret.
        let snapshots = store.indexed("terraform-state");
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].get("resources").is_none());
        assert_eq!(snapshots[0]["timestamp"].as_str().unwrap(), resource_ts);
        let masked = snapshots[0]["secret_key"].as_str().unwrap();
        assert!(masked.starts_with("tfb_"));
        assert_ne!(masked, "mysecret");

        // The merged read restores the plaintext and rejoins the resource.
        let merged = repo.load_latest().await.unwrap();
        assert_eq!(merged["secret_key"], "mysecret");
        assert_eq!(merged["timestamp"].as_str().unwrap(), resource_ts);
        assert_eq!(merged["resources"][0]["id"], "i-1");
    }

    #[tokio::test]
    async fn join_returns_exactly_the_snapshots_resources() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = repository(store.clone(), &[]);

        repo.store_snapshot(br#"{"resources":[{"id":"a"},{"id":"b"},{"id":"c"}]}"#)
            .await
            .unwrap();

        let merged = repo.load_latest().await.unwrap();
        let mut ids: Vec<String> = merged["resources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn latest_snapshot_wins() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = repository(store.clone(), &[]);

        // Same-second writes: the later insertion wins the tie, matching a
        // descending sort over the store.
        repo.store_snapshot(br#"{"serial": 1, "resources": []}"#)
            .await
            .unwrap();
        repo.store_snapshot(br#"{"serial": 2, "resources": []}"#)
            .await
            .unwrap();

        let merged = repo.load_latest().await.unwrap();
        assert_eq!(merged["serial"], 2);
    }

    #[tokio::test]
    async fn invalid_json_is_malformed_input() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = repository(store, &[]);
        let err = repo.store_snapshot(b"not json").await.unwrap_err();
        assert!(matches!(err, BackendError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn missing_resources_is_malformed_input() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = repository(store, &[]);
        let err = repo
            .store_snapshot(br#"{"version": 4}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn non_object_resource_is_malformed_input() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = repository(store, &[]);
        let err = repo
            .store_snapshot(br#"{"resources": ["just-a-string"]}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn empty_store_reads_as_not_found() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = repository(store, &[]);
        let err = repo.load_latest().await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_store_unavailable() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = repository(store.clone(), &[]);

        store.set_failing(true);
        let err = repo
            .store_snapshot(br#"{"resources": [{"id": "i-1"}]}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::StoreUnavailable(_)));
    }
}
