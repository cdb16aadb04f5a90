//! Core entities and the document field names shared across components.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Field carrying a document's timestamp. It is the join key between a
/// snapshot and its resources.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Top-level field holding the resource array on the wire.
pub const RESOURCES_FIELD: &str = "resources";

/// A lock document keyed by project identifier.
///
/// Its existence in the lock collection *is* the locked state; there is no
/// separate flag, TTL, or expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub project: String,
    #[serde(rename = "lockedBy")]
    pub locked_by: String,
    #[serde(default)]
    pub version: i64,
}

impl LockRecord {
    pub fn new(project: impl Into<String>, locked_by: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            locked_by: locked_by.into(),
            version: 0,
        }
    }

    /// The document body written to the lock collection.
    pub fn to_document(&self) -> Value {
        json!({
            "project": self.project,
            "lockedBy": self.locked_by,
            "version": self.version,
        })
    }
}

/// Names of the document collections a project's documents live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
    pub snapshots: String,
    pub resources: String,
    pub locks: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            snapshots: "terraform-state".to_string(),
            resources: "terraform-resources".to_string(),
            locks: "terraform-locks".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_record_round_trips_through_its_document_form() {
        let lock = LockRecord::new("prod", "10.0.0.7:52114");
        let doc = lock.to_document();

        assert_eq!(doc["lockedBy"], "10.0.0.7:52114");

        let parsed: LockRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(parsed, lock);
    }

    #[test]
    fn default_collections_match_the_deployment_index_names() {
        let collections = Collections::default();
        assert_eq!(collections.snapshots, "terraform-state");
        assert_eq!(collections.resources, "terraform-resources");
        assert_eq!(collections.locks, "terraform-locks");
    }
}
