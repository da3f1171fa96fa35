use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::repository::{RemoteDocumentStore, StorageError};

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl RemoteConfig {
    /// Reads `PREPARE_REMOTE_URL` and `PREPARE_REMOTE_TOKEN`.
    ///
    /// Returns `None` when no base URL is configured; the app then runs
    /// without a remote mirror.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("PREPARE_REMOTE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let token = env::var("PREPARE_REMOTE_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Some(Self { base_url, token })
    }
}

/// JSON document store reached over HTTPS.
///
/// Documents live at `{base_url}/{path}.json`; `GET` reads and `PUT`
/// overwrites the whole document.
#[derive(Clone)]
pub struct HttpDocumentStore {
    client: Client,
    config: RemoteConfig,
}

impl HttpDocumentStore {
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}.json",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Map a read response onto the document store contract.
///
/// A 404 or a `null` body is an absent document.
fn read_document(path: &str, status: StatusCode, body: &str) -> Result<Option<Value>, StorageError> {
    if status == StatusCode::NOT_FOUND {
        debug!(path, "remote document not found");
        return Ok(None);
    }
    if !status.is_success() {
        warn!(path, %status, "remote read rejected");
        return Err(StorageError::Connection(format!(
            "remote read returned status {status}"
        )));
    }
    let document: Value =
        serde_json::from_str(body).map_err(|e| StorageError::Serialization(e.to_string()))?;
    // Some document backends answer a missing path with `null`.
    Ok(if document.is_null() { None } else { Some(document) })
}

fn check_write(path: &str, status: StatusCode) -> Result<(), StorageError> {
    if status.is_success() {
        debug!(path, %status, "remote document written");
        return Ok(());
    }
    warn!(path, %status, "remote write rejected");
    Err(StorageError::Connection(format!(
        "remote write returned status {status}"
    )))
}

#[async_trait]
impl RemoteDocumentStore for HttpDocumentStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StorageError> {
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        read_document(path, status, &body)
    }

    async fn write(&self, path: &str, document: &Value) -> Result<(), StorageError> {
        let response = self
            .authorize(self.client.put(self.url(path)))
            .json(document)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        check_write(path, response.status())
    }
}
