//! # State Backend Core
//!
//! The persistence core of the tf-backend: versioned snapshot storage with
//! resource splitting, per-project distributed locking, and selective field
//! encryption through a secret transit engine.
//!
//! ## Domain Rules
//!
//! | Rule | Description |
//! |------|-------------|
//! | Shared timestamp | A snapshot and all its resources carry one timestamp; it is the only join key |
//! | Most recent wins | The current snapshot is the one with the maximum timestamp; nothing is ever mutated |
//! | Presence is lock | A lock document existing under a project id *is* the locked state |
//! | Marker framing | Encrypted values are stored as `tfb_` + transit ciphertext; unmarked values pass through verbatim |
//! | No rollback | Resource writes commit individually; the snapshot write is the commit point |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Tree walker, path patterns, field cipher, entities, errors
//! - `ports/` - Outbound port traits (document store, secret transit, provider)
//! - `service/` - Application services (`StateRepository`, `LockManager`)
//! - `adapters/` - In-memory adapters for unit tests
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tfb_core::{
//!     Collections, CryptoPath, FieldCipher, InMemoryDocumentStore, InMemoryTransit,
//!     StateRepository,
//! };
//!
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let transit = Arc::new(InMemoryTransit::default());
//! let patterns = Arc::new(CryptoPath::compile_all(["\\.secret_key"])?);
//!
//! let cipher = FieldCipher::new(transit, patterns, "my-project");
//! let repo = StateRepository::new(store, Collections::default(), cipher, "my-project");
//! repo.store_snapshot(br#"{"resources":[],"secret_key":"hunter2"}"#).await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use domain::cipher::{FieldCipher, CIPHERTEXT_MARKER, TRANSIT_CIPHERTEXT_TAG};
pub use domain::entities::{Collections, LockRecord, RESOURCES_FIELD, TIMESTAMP_FIELD};
pub use domain::errors::{BackendError, StoreError, TransitError};
pub use domain::path::CryptoPath;
pub use ports::{
    CreateOutcome, DeleteOutcome, DocumentQuery, DocumentStore, ProjectStore, SecretTransit,
    StoreProvider,
};
pub use service::{LockManager, StateRepository};

// Re-export in-memory adapters for downstream tests
pub use adapters::memory::{InMemoryDocumentStore, InMemoryProvider, InMemoryTransit};
