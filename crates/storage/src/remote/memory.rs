use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::{RemoteDocument, RemoteDocumentStore, RemoteError, RemoteErrorCode};

/// Process-local document store.
///
/// Used when no remote URL is configured and in tests, where it can be armed to
/// fail every call with a chosen error code.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<String, Value>>>,
    failure: Arc<Mutex<Option<RemoteError>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw JSON document, bypassing the typed write path.
    pub fn insert_raw(&self, key: &str, value: Value) {
        if let Ok(mut guard) = self.documents.lock() {
            guard.insert(key.to_owned(), value);
        }
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.documents
            .lock()
            .ok()
            .and_then(|guard| guard.get(key).cloned())
    }

    /// Make every following read and write fail with `code`.
    pub fn fail_with(&self, code: RemoteErrorCode, message: &str) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = Some(RemoteError::new(code, message));
        }
    }

    pub fn clear_failure(&self) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = None;
        }
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), RemoteError> {
        let guard = self.failure.lock().map_err(|e| poisoned(&e.to_string()))?;
        match guard.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Copy top-level fields of `incoming` onto `existing`.
///
/// Returns the value to store when there is nothing to merge into.
fn merge_top_level(existing: Option<&mut Value>, incoming: Value) -> Option<Value> {
    match (existing, incoming) {
        (Some(Value::Object(existing)), Value::Object(fields)) => {
            for (field, value) in fields {
                existing.insert(field, value);
            }
            None
        }
        (_, incoming) => Some(incoming),
    }
}

fn poisoned(message: &str) -> RemoteError {
    RemoteError::new(RemoteErrorCode::Other, message)
}

#[async_trait]
impl RemoteDocumentStore for InMemoryDocumentStore {
    async fn read(&self, key: &str) -> Result<Option<RemoteDocument>, RemoteError> {
        self.check_failure()?;
        let guard = self.documents.lock().map_err(|e| poisoned(&e.to_string()))?;
        let Some(value) = guard.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| RemoteError::new(RemoteErrorCode::InvalidDocument, e.to_string()))
    }

    async fn write(
        &self,
        key: &str,
        document: &RemoteDocument,
        merge: bool,
    ) -> Result<(), RemoteError> {
        self.check_failure()?;
        let incoming = serde_json::to_value(document)
            .map_err(|e| RemoteError::new(RemoteErrorCode::InvalidDocument, e.to_string()))?;

        let mut guard = self.documents.lock().map_err(|e| poisoned(&e.to_string()))?;
        let replacement = if merge {
            merge_top_level(guard.get_mut(key), incoming)
        } else {
            Some(incoming)
        };
        if let Some(value) = replacement {
            guard.insert(key.to_owned(), value);
        }
        drop(guard);

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::{ProgressPatch, UserProgress};
    use serde_json::json;

    fn document(score: u32) -> RemoteDocument {
        let mut patch = ProgressPatch::from(&UserProgress::default());
        patch.score = Some(score);
        RemoteDocument {
            progress: patch,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn missing_document_is_none() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(store.read("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn merge_write_keeps_unrelated_fields() {
        let store = InMemoryDocumentStore::new();
        store.insert_raw("user", json!({ "owner": "tablet", "progress": {} }));

        store.write("user", &document(3), true).await.unwrap();

        let raw = store.raw("user").unwrap();
        assert_eq!(raw["owner"], "tablet");
        assert_eq!(raw["progress"]["score"], 3);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn plain_write_replaces_document() {
        let store = InMemoryDocumentStore::new();
        store.insert_raw("user", json!({ "owner": "tablet" }));

        store.write("user", &document(1), false).await.unwrap();

        assert!(store.raw("user").unwrap().get("owner").is_none());
    }

    #[tokio::test]
    async fn armed_failure_applies_until_cleared() {
        let store = InMemoryDocumentStore::new();
        store.fail_with(RemoteErrorCode::PermissionDenied, "rules reject");

        let err = store.read("user").await.unwrap_err();
        assert!(err.is_permission_denied());
        assert!(store.write("user", &document(1), true).await.is_err());
        assert_eq!(store.write_count(), 0);

        store.clear_failure();
        store.write("user", &document(1), true).await.unwrap();
        let doc = store.read("user").await.unwrap().unwrap();
        assert_eq!(doc.progress.score, Some(1));
    }
}
