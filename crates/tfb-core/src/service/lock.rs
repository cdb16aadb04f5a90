//! Optimistic distributed locking per project.
//!
//! The document store's atomic create-if-absent insert is the only
//! coordination primitive; the manager holds no mutex, queue, or in-memory
//! registry of locks.

use std::sync::Arc;

use tracing::info;

use crate::domain::entities::LockRecord;
use crate::domain::errors::BackendError;
use crate::ports::{CreateOutcome, DeleteOutcome, DocumentStore};

/// Create-based mutual exclusion over lock documents keyed by project.
pub struct LockManager {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl LockManager {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Try to take the lock for `project` on behalf of `holder`.
    /// `Ok(false)` means the lock is already held, which is not an error.
    pub async fn acquire(&self, project: &str, holder: &str) -> Result<bool, BackendError> {
        let lock = LockRecord::new(project, holder);
        match self
            .store
            .create_if_absent(&self.collection, project, &lock.to_document())
            .await?
        {
            CreateOutcome::Created => {
                info!(project = %project, holder = %holder, "lock acquired");
                Ok(true)
            }
            CreateOutcome::Conflict => {
                info!(project = %project, "lock already held");
                Ok(false)
            }
        }
    }

    /// Release the lock for `project`. Releasing a lock that does not exist
    /// is `Ok(false)`, not an error. The holder is not verified: any caller
    /// who knows the project identifier may release its lock.
    pub async fn release(&self, project: &str) -> Result<bool, BackendError> {
        match self.store.delete(&self.collection, project).await? {
            DeleteOutcome::Deleted => {
                info!(project = %project, "lock released");
                Ok(true)
            }
            DeleteOutcome::NotFound => {
                info!(project = %project, "lock did not exist");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryDocumentStore;

    fn manager(store: Arc<InMemoryDocumentStore>) -> LockManager {
        LockManager::new(store, "terraform-locks")
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let locks = manager(store.clone());

        assert!(locks.acquire("proj", "a").await.unwrap());
        assert!(!locks.acquire("proj", "b").await.unwrap());

        assert!(locks.release("proj").await.unwrap());
        assert!(locks.acquire("proj", "b").await.unwrap());
    }

    #[tokio::test]
    async fn releasing_an_absent_lock_is_false_not_an_error() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let locks = manager(store);

        assert!(!locks.release("proj").await.unwrap());
    }

    #[tokio::test]
    async fn projects_lock_independently() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let locks = manager(store);

        assert!(locks.acquire("proj-a", "x").await.unwrap());
        assert!(locks.acquire("proj-b", "x").await.unwrap());
    }

    #[tokio::test]
    async fn lock_document_records_the_holder() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let locks = manager(store.clone());

        locks.acquire("proj", "10.1.2.3:40000").await.unwrap();

        let doc = store.keyed("terraform-locks", "proj").unwrap();
        let record: LockRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.project, "proj");
        assert_eq!(record.locked_by, "10.1.2.3:40000");
        assert_eq!(record.version, 0);
    }

    #[tokio::test]
    async fn store_failure_is_an_error_not_a_conflict() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let locks = manager(store.clone());

        store.set_failing(true);
        assert!(locks.acquire("proj", "a").await.is_err());
        assert!(locks.release("proj").await.is_err());
    }
}
