use std::sync::Arc;

use quiz_core::{Clock, QuestionCatalog};
use storage::Storage;
use storage::remote::RemoteDocumentStore;
use tracing::info;

use crate::error::AppServicesError;
use crate::explain_service::Explainer;
use crate::preferences_service::PreferencesService;
use crate::progress_store::ProgressStore;
use crate::sessions::QuizSession;
use crate::sync::{PullOutcome, SyncCoordinator, SyncOptions};

/// Wires the progress store, sync coordinator and session together.
///
/// Construction loads local progress and runs the startup pull before the
/// session exists, so no user action can race the remote merge.
pub struct AppServices {
    session: QuizSession,
    sync: Arc<SyncCoordinator>,
    preferences: PreferencesService,
    explainer: Arc<dyn Explainer>,
    pull_outcome: PullOutcome,
}

impl AppServices {
    pub async fn new(
        catalog: Arc<dyn QuestionCatalog>,
        storage: Storage,
        remote: Arc<dyn RemoteDocumentStore>,
        options: SyncOptions,
        explainer: Arc<dyn Explainer>,
        clock: Clock,
    ) -> Self {
        let mut store = ProgressStore::load(Arc::clone(&storage.local)).await;
        let sync = Arc::new(SyncCoordinator::new(remote, options, clock));
        let pull_outcome = sync.pull(&mut store).await;
        store.attach_sync(Arc::clone(&sync));
        info!(?pull_outcome, "progress ready");

        Self {
            session: QuizSession::new(catalog, store),
            sync,
            preferences: PreferencesService::new(storage.local),
            explainer,
            pull_outcome,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        catalog: Arc<dyn QuestionCatalog>,
        remote: Arc<dyn RemoteDocumentStore>,
        options: SyncOptions,
        explainer: Arc<dyn Explainer>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(catalog, storage, remote, options, explainer, clock).await)
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut QuizSession {
        &mut self.session
    }

    #[must_use]
    pub fn sync(&self) -> Arc<SyncCoordinator> {
        Arc::clone(&self.sync)
    }

    #[must_use]
    pub fn preferences(&self) -> &PreferencesService {
        &self.preferences
    }

    #[must_use]
    pub fn pull_outcome(&self) -> PullOutcome {
        self.pull_outcome
    }

    /// Explain the current graded question using the configured explainer.
    pub async fn ask_explanation(&mut self) -> Option<&str> {
        self.session.ask_explanation(self.explainer.as_ref()).await
    }

    /// Push any snapshot still waiting out the debounce delay.
    pub async fn shutdown(&self) {
        if self.sync.has_pending_push() {
            self.sync.flush(self.session.progress()).await;
        }
    }
}
