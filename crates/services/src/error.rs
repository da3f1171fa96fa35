//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by mutating `CompletionStore` operations.
///
/// Only the local write is authoritative; remote mirror failures are logged
/// and never surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionError {
    #[error("failed to persist completion state locally: {0}")]
    LocalWrite(#[source] StorageError),
    #[error("failed to encode completion state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] prepare_core::model::CatalogError),
}
