//! Remote document store holding the shared progress snapshot.
//!
//! One document per user key, shaped `{ "progress": {...}, "updatedAt": "..." }`.
//! A missing document is `Ok(None)`, never an error.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::ProgressPatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::InMemoryDocumentStore;

/// Key under which every device stores its progress.
pub const SHARED_USER_KEY: &str = "shared_user";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    #[serde(default)]
    pub progress: ProgressPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RemoteErrorCode {
    PermissionDenied,
    Unavailable,
    InvalidDocument,
    Other,
}

impl fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteErrorCode::PermissionDenied => "permission-denied",
            RemoteErrorCode::Unavailable => "unavailable",
            RemoteErrorCode::InvalidDocument => "invalid-document",
            RemoteErrorCode::Other => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: RemoteErrorCode,
    pub message: String,
}

impl RemoteError {
    #[must_use]
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        self.code == RemoteErrorCode::PermissionDenied
    }
}

/// Contract for the cross-device document store.
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Read the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the store rejects or cannot serve the read.
    async fn read(&self, key: &str) -> Result<Option<RemoteDocument>, RemoteError>;

    /// Write `document` under `key`.
    ///
    /// With `merge`, top-level fields absent from `document` keep their stored
    /// values; without it the stored document is replaced.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the store rejects or cannot accept the write.
    async fn write(
        &self,
        key: &str,
        document: &RemoteDocument,
        merge: bool,
    ) -> Result<(), RemoteError>;
}
