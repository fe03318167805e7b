//! Shared error types for the services crate.

use thiserror::Error;

use storage::catalog_file::CatalogFileError;
use storage::remote::RemoteError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ExplanationService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExplainError {
    #[error("explanation service is not configured")]
    Disabled,
    #[error("explanation service returned an empty response")]
    EmptyResponse,
    #[error("explanation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `ProgressStore` when a snapshot cannot be written locally.
///
/// The in-memory state has already changed when one of these is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressStoreError {
    #[error("failed to encode progress: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogFileError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
