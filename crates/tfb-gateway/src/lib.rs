//! # State Backend Gateway
//!
//! HTTP transport for the state backend: the `/state/{project}` protocol
//! route (`GET`/`POST`/`LOCK`/`UNLOCK`), Basic-Authentication middleware
//! over an abstract credential verifier, YAML configuration, and the
//! server bootstrap with graceful shutdown.
//!
//! The gateway owns no storage or crypto logic; it constructs tfb-core
//! services per request from `Arc`-shared ports and maps error kinds to
//! status codes.

pub mod config;
pub mod middleware;
pub mod ports;
pub mod router;
pub mod server;

// Re-export key types for convenience
pub use config::{BackendConfig, ConfigError};
pub use middleware::BasicAuthLayer;
pub use ports::{AuthError, CredentialVerifier, StaticCredentials};
pub use router::{build_router, AppState};
pub use server::{GatewayError, GatewayService};
