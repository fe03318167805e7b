use std::sync::Arc;

use quiz_core::{
    AnswerContext, ProgressPatch, Question, QuestionId, QuestionType, QuizId, UserProgress, merge,
};
use storage::repository::{KeyValueStore, PROGRESS_KEY};
use tracing::{debug, warn};

use crate::error::ProgressStoreError;
use crate::sync::SyncCoordinator;

/// Owner of the single `UserProgress` value.
///
/// Every mutation that changes state is written to local storage before the
/// call returns and then handed to the sync coordinator (if attached) for a
/// debounced remote push. Calls that change nothing touch neither sink.
pub struct ProgressStore {
    progress: UserProgress,
    local: Arc<dyn KeyValueStore>,
    sync: Option<Arc<SyncCoordinator>>,
}

impl ProgressStore {
    /// Load the persisted snapshot, falling back to an empty one.
    ///
    /// Missing, unreadable or corrupt data all produce the default progress;
    /// this never fails.
    pub async fn load(local: Arc<dyn KeyValueStore>) -> Self {
        let progress = match local.get(PROGRESS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<UserProgress>(&raw) {
                Ok(progress) => progress,
                Err(err) => {
                    warn!(error = %err, "stored progress is corrupt; starting fresh");
                    UserProgress::default()
                }
            },
            Ok(None) => {
                debug!("no stored progress; starting fresh");
                UserProgress::default()
            }
            Err(err) => {
                warn!(error = %err, "failed to read stored progress; starting fresh");
                UserProgress::default()
            }
        };

        Self {
            progress,
            local,
            sync: None,
        }
    }

    /// Route future mutations to `sync` for remote propagation.
    pub fn attach_sync(&mut self, sync: Arc<SyncCoordinator>) {
        self.sync = Some(sync);
    }

    #[must_use]
    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    /// Select or toggle an option. See `UserProgress::apply_selection`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn apply_selection(
        &mut self,
        question_id: &QuestionId,
        option_index: usize,
        kind: QuestionType,
    ) -> Result<bool, ProgressStoreError> {
        let changed = self
            .progress
            .apply_selection(question_id, option_index, kind);
        if changed {
            self.commit().await?;
        }
        Ok(changed)
    }

    /// Grade the current selection. See `UserProgress::apply_submission`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn apply_submission(
        &mut self,
        question: &Question,
        context: AnswerContext,
    ) -> Result<Option<bool>, ProgressStoreError> {
        let outcome = self.progress.apply_submission(question, context);
        if let Some(is_correct) = outcome {
            debug!(question_id = %question.id, is_correct, ?context, "answer graded");
            self.commit().await?;
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn mark_quiz_completed(
        &mut self,
        quiz_id: &QuizId,
    ) -> Result<bool, ProgressStoreError> {
        let changed = self.progress.mark_quiz_completed(quiz_id);
        if changed {
            debug!(%quiz_id, "quiz completed");
            self.commit().await?;
        }
        Ok(changed)
    }

    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn record_cursor(
        &mut self,
        quiz_id: &QuizId,
        index: usize,
    ) -> Result<bool, ProgressStoreError> {
        let changed = self.progress.record_cursor(quiz_id, index);
        if changed {
            self.commit().await?;
        }
        Ok(changed)
    }

    /// Drop a quiz's answers and resume position.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn reset_quiz(
        &mut self,
        quiz_id: &QuizId,
        question_ids: &[QuestionId],
    ) -> Result<bool, ProgressStoreError> {
        let changed = self.progress.reset_quiz(quiz_id, question_ids);
        if changed {
            debug!(%quiz_id, questions = question_ids.len(), "quiz reset");
            self.commit().await?;
        }
        Ok(changed)
    }

    /// Overlay a pulled remote snapshot and persist it locally.
    ///
    /// No remote push is scheduled; the data just came from there.
    pub(crate) async fn adopt_remote(
        &mut self,
        remote: &ProgressPatch,
    ) -> Result<(), ProgressStoreError> {
        self.progress = merge(&self.progress, remote);
        self.persist_local().await
    }

    async fn commit(&self) -> Result<(), ProgressStoreError> {
        let local = self.persist_local().await;
        if let Some(sync) = &self.sync {
            sync.schedule_push(&self.progress);
        }
        local
    }

    async fn persist_local(&self) -> Result<(), ProgressStoreError> {
        let json = serde_json::to_string(&self.progress)?;
        self.local.set(PROGRESS_KEY, &json).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore")
            .field("progress", &self.progress)
            .field("sync_attached", &self.sync.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::repository::{InMemoryRepository, StorageError};

    struct FailingWrites;

    #[async_trait]
    impl KeyValueStore for FailingWrites {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk full".into()))
        }
    }

    #[tokio::test]
    async fn corrupt_snapshot_loads_default() {
        let repo = InMemoryRepository::new();
        repo.set(PROGRESS_KEY, "{not json").await.unwrap();
        let store = ProgressStore::load(Arc::new(repo)).await;
        assert_eq!(store.progress(), &UserProgress::default());
    }

    #[tokio::test]
    async fn mutation_is_persisted_before_returning() {
        let repo = InMemoryRepository::new();
        let mut store = ProgressStore::load(Arc::new(repo.clone())).await;

        store
            .apply_selection(&QuestionId::new("q"), 1, QuestionType::Single)
            .await
            .unwrap();

        let raw = repo.get(PROGRESS_KEY).await.unwrap().unwrap();
        let saved: UserProgress = serde_json::from_str(&raw).unwrap();
        assert_eq!(&saved, store.progress());
    }

    #[tokio::test]
    async fn unchanged_cursor_skips_write() {
        let repo = InMemoryRepository::new();
        let mut store = ProgressStore::load(Arc::new(repo.clone())).await;
        let quiz = QuizId::new("quiz");

        assert!(store.record_cursor(&quiz, 2).await.unwrap());
        repo.set(PROGRESS_KEY, "sentinel").await.unwrap();
        assert!(!store.record_cursor(&quiz, 2).await.unwrap());
        assert_eq!(repo.get(PROGRESS_KEY).await.unwrap().as_deref(), Some("sentinel"));
    }

    #[tokio::test]
    async fn failed_local_write_keeps_in_memory_change() {
        let mut store = ProgressStore::load(Arc::new(FailingWrites)).await;
        let quiz = QuizId::new("quiz");

        let err = store.mark_quiz_completed(&quiz).await.unwrap_err();
        assert!(matches!(err, ProgressStoreError::Storage(_)));
        assert!(store.progress().is_completed(&quiz));
    }

    #[tokio::test]
    async fn persisted_snapshot_survives_reload() {
        let repo = InMemoryRepository::new();
        let mut store = ProgressStore::load(Arc::new(repo.clone())).await;
        store.mark_quiz_completed(&QuizId::new("quiz")).await.unwrap();

        let reloaded = ProgressStore::load(Arc::new(repo)).await;
        assert!(reloaded.progress().is_completed(&QuizId::new("quiz")));
    }
}
