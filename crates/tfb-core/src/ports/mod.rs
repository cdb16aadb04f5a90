//! Port traits the core is driven against.

pub mod outbound;

pub use outbound::{
    CreateOutcome, DeleteOutcome, DocumentQuery, DocumentStore, ProjectStore, SecretTransit,
    StoreProvider,
};
