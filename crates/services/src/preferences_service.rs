use std::sync::Arc;

use storage::repository::{DARK_MODE_KEY, KeyValueStore, StorageError};
use tracing::warn;

/// Display preferences kept next to progress in local storage.
#[derive(Clone)]
pub struct PreferencesService {
    repo: Arc<dyn KeyValueStore>,
}

impl PreferencesService {
    #[must_use]
    pub fn new(repo: Arc<dyn KeyValueStore>) -> Self {
        Self { repo }
    }

    /// Stored theme, or light when unset or unreadable.
    pub async fn dark_mode(&self) -> bool {
        match self.repo.get(DARK_MODE_KEY).await {
            Ok(value) => value.as_deref().map(str::trim) == Some("true"),
            Err(err) => {
                warn!(error = %err, "failed to read theme preference");
                false
            }
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the preference cannot be stored.
    pub async fn set_dark_mode(&self, enabled: bool) -> Result<(), StorageError> {
        self.repo
            .set(DARK_MODE_KEY, if enabled { "true" } else { "false" })
            .await
    }

    /// Flip the theme and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the preference cannot be stored.
    pub async fn toggle_dark_mode(&self) -> Result<bool, StorageError> {
        let enabled = !self.dark_mode().await;
        self.set_dark_mode(enabled).await?;
        Ok(enabled)
    }
}
