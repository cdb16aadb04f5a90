//! Port traits the gateway is driven against.

pub mod outbound;

pub use outbound::{AuthError, CredentialVerifier, StaticCredentials};
