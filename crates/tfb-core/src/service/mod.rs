//! Application services: snapshot storage/retrieval and per-project
//! locking, built over the outbound ports.

pub mod lock;
pub mod state;

pub use lock::LockManager;
pub use state::StateRepository;
