//! Production port adapters: the Elasticsearch document store and the
//! Vault secret-store client.

pub mod elastic;
pub mod vault;
