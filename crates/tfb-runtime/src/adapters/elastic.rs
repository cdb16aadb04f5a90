//! Elasticsearch adapter for the document-store port.
//!
//! Documents are plain JSON bodies; create-if-absent maps to `_create`,
//! keyed deletes to `_doc`, inserts to `_doc?refresh=true` so writes are
//! visible to the next read, and the two query shapes to `_search` bodies.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Certificate, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use tfb_core::{
    Collections, CreateOutcome, DeleteOutcome, DocumentQuery, DocumentStore, ProjectStore,
    StoreError, StoreProvider,
};

use crate::adapters::vault::VaultClient;

/// Per-project document-store settings, read from the secret store's KV2
/// engine. Every field falls back to its default when the secret omits it,
/// so a project with no secret at all runs against a local cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Cluster addresses, comma separated; the first is used.
    pub addresses: String,
    pub username: String,
    pub password: String,
    pub state_index: String,
    pub resource_index: String,
    pub lock_index: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            addresses: "https://localhost:9200".to_string(),
            username: "elastic".to_string(),
            password: "elastic".to_string(),
            state_index: "terraform-state".to_string(),
            resource_index: "terraform-resources".to_string(),
            lock_index: "terraform-locks".to_string(),
        }
    }
}

impl ProjectSettings {
    /// Load settings from a KV2 secret body; absent fields default.
    pub fn from_secret(secret: Value) -> Result<Self, StoreError> {
        serde_json::from_value(secret)
            .map_err(|e| StoreError::new(format!("invalid project settings: {}", e)))
    }

    /// The collections this project's documents live in.
    pub fn collections(&self) -> Collections {
        Collections {
            snapshots: self.state_index.clone(),
            resources: self.resource_index.clone(),
            locks: self.lock_index.clone(),
        }
    }

    /// The first configured cluster address, without a trailing slash.
    pub fn primary_address(&self) -> &str {
        self.addresses
            .split(',')
            .next()
            .unwrap_or(&self.addresses)
            .trim()
            .trim_end_matches('/')
    }
}

/// Document-store adapter over the Elasticsearch HTTP API.
pub struct ElasticStore {
    http: Client,
    base: String,
    username: String,
    password: String,
}

impl ElasticStore {
    /// Build a client for one project's cluster. `ca_pem` is the trust
    /// anchor for https addresses signed by a private CA.
    pub fn connect(settings: &ProjectSettings, ca_pem: Option<&[u8]>) -> Result<Self, StoreError> {
        let mut builder = Client::builder();
        if let Some(pem) = ca_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| StoreError::new(format!("invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder
            .build()
            .map_err(|e| StoreError::new(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            base: settings.primary_address().to_string(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::new(err.to_string())
}

fn unexpected(operation: &str, status: StatusCode) -> StoreError {
    StoreError::new(format!("{} returned unexpected status {}", operation, status))
}

/// The search body for each query shape.
fn query_body(query: &DocumentQuery) -> Value {
    match query {
        DocumentQuery::LatestByTimestamp => json!({
            "size": 1,
            "sort": [{ "timestamp": { "order": "desc" } }],
        }),
        DocumentQuery::TimestampEquals(ts) => json!({
            "query": { "match": { "timestamp": ts } },
        }),
    }
}

/// Pull the `_source` bodies out of a search response.
fn extract_sources(response: &Value) -> Vec<Value> {
    response["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit.get("_source").cloned())
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> Result<CreateOutcome, StoreError> {
        let url = format!("{}/{}/_create/{}", self.base, collection, id);
        let response = self
            .request(reqwest::Method::PUT, url)
            .query(&[("refresh", "true")])
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(CreateOutcome::Created),
            StatusCode::CONFLICT => Ok(CreateOutcome::Conflict),
            status => Err(unexpected("create", status)),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<DeleteOutcome, StoreError> {
        let url = format!("{}/{}/_doc/{}", self.base, collection, id);
        let response = self
            .request(reqwest::Method::DELETE, url)
            .query(&[("refresh", "true")])
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::OK => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            status => Err(unexpected("delete", status)),
        }
    }

    async fn index(&self, collection: &str, body: &Value) -> Result<(), StoreError> {
        let url = format!("{}/{}/_doc", self.base, collection);
        let response = self
            .request(reqwest::Method::POST, url)
            .query(&[("refresh", "true")])
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(unexpected("index", response.status()));
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}/{}/_search", self.base, collection);
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&query_body(query))
            .send()
            .await
            .map_err(transport)?;

        // A collection nobody has written to yet does not exist; that is
        // an empty result, not a transport failure.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(unexpected("search", response.status()));
        }

        let body: Value = response.json().await.map_err(transport)?;
        let sources = extract_sources(&body);
        debug!(collection = %collection, hits = sources.len(), "search completed");
        Ok(sources)
    }
}

/// Store provider reading per-project settings from the secret store on
/// each open, so settings changes apply without a restart.
pub struct ElasticProvider {
    vault: Arc<VaultClient>,
    ca_pem: Option<Vec<u8>>,
}

impl ElasticProvider {
    pub fn new(vault: Arc<VaultClient>, ca_pem: Option<Vec<u8>>) -> Self {
        Self { vault, ca_pem }
    }
}

#[async_trait]
impl StoreProvider for ElasticProvider {
    async fn open(&self, project: &str) -> Result<ProjectStore, StoreError> {
        let settings = match self.vault.read_kv2(project).await? {
            Some(secret) => ProjectSettings::from_secret(secret)?,
            None => ProjectSettings::default(),
        };
        let store = ElasticStore::connect(&settings, self.ca_pem.as_deref())?;
        Ok(ProjectStore {
            store: Arc::new(store),
            collections: settings.collections(),
        })
    }
}
