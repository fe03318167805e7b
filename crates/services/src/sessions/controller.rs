use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quiz_core::{
    AnswerContext, Question, QuestionCatalog, QuestionId, QuestionResult, QuizId, QuizSummary,
    UserProgress,
};
use tracing::debug;

use super::progress::SessionPosition;
use super::view::DashboardEntry;
use crate::error::ProgressStoreError;
use crate::explain_service::Explainer;
use crate::progress_store::ProgressStore;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Drives one user through the catalog.
///
/// Holds the view state (active quiz, cursor, review/results flags) and turns
/// user intents into `ProgressStore` calls. Actions that make no sense in the
/// current state (submitting nothing, selecting after grading, moving past
/// either end) are silently ignored.
pub struct QuizSession {
    catalog: Arc<dyn QuestionCatalog>,
    store: ProgressStore,
    active_quiz: Option<QuizId>,
    cursor: usize,
    review_mode: bool,
    showing_results: bool,
    explanations: HashMap<QuestionId, String>,
}

impl QuizSession {
    #[must_use]
    pub fn new(catalog: Arc<dyn QuestionCatalog>, store: ProgressStore) -> Self {
        Self {
            catalog,
            store,
            active_quiz: None,
            cursor: 0,
            review_mode: false,
            showing_results: false,
            explanations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    #[must_use]
    pub fn progress(&self) -> &UserProgress {
        self.store.progress()
    }

    #[must_use]
    pub fn active_quiz(&self) -> Option<&QuizId> {
        self.active_quiz.as_ref()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_review_mode(&self) -> bool {
        self.review_mode
    }

    #[must_use]
    pub fn is_showing_results(&self) -> bool {
        self.showing_results
    }

    /// Every quiz with its completion flag.
    #[must_use]
    pub fn dashboard(&self) -> Vec<DashboardEntry> {
        let progress = self.store.progress();
        self.catalog
            .list_quizzes()
            .into_iter()
            .map(|quiz| DashboardEntry {
                completed: progress.is_completed(&quiz.id),
                quiz,
            })
            .collect()
    }

    /// Questions the cursor walks over.
    ///
    /// In review mode only questions with a recorded result that is not a
    /// correct submission are included.
    #[must_use]
    pub fn visible_questions(&self) -> Vec<&Question> {
        self.visible_in(self.catalog.as_ref())
    }

    /// The question under the cursor, if the quiz view is showing one.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_in(self.catalog.as_ref())
    }

    /// Stored result for the current question, or an empty one.
    #[must_use]
    pub fn current_result(&self) -> QuestionResult {
        self.current_question()
            .and_then(|q| self.store.progress().result(&q.id))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn position(&self) -> Option<SessionPosition> {
        if self.active_quiz.is_none() {
            return None;
        }
        Some(SessionPosition {
            current: self.cursor + 1,
            total: self.visible_questions().len(),
            review: self.review_mode,
        })
    }

    /// Results-screen tally for the active quiz.
    #[must_use]
    pub fn summary(&self) -> Option<QuizSummary> {
        let quiz = self.active_quiz.as_ref()?;
        Some(QuizSummary::compute(
            self.catalog.questions_for(quiz),
            self.store.progress(),
        ))
    }

    /// Cached AI explanation for the current question.
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        let question = self.current_question()?;
        self.explanations.get(&question.id).map(String::as_str)
    }

    /// Open a quiz from the dashboard.
    ///
    /// Resumes at the stored cursor, else at the first unsubmitted question,
    /// else at the start. Unknown or empty quizzes are ignored. Returns
    /// whether a quiz was opened.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if recording the cursor fails locally.
    pub async fn select_quiz(&mut self, quiz_id: &QuizId) -> Result<bool, ProgressStoreError> {
        let questions = self.catalog.questions_for(quiz_id);
        if questions.is_empty() {
            debug!(%quiz_id, "ignoring selection of unknown or empty quiz");
            return Ok(false);
        }

        let start = resume_index(quiz_id, questions, self.store.progress());
        self.active_quiz = Some(quiz_id.clone());
        self.cursor = start;
        self.review_mode = false;
        self.showing_results = false;
        self.explanations.clear();
        debug!(%quiz_id, start, "quiz opened");

        self.mirror_cursor().await?;
        Ok(true)
    }

    /// Go back to the dashboard.
    pub fn leave_quiz(&mut self) {
        self.active_quiz = None;
        self.cursor = 0;
        self.review_mode = false;
        self.showing_results = false;
    }

    /// Pick an option on the current question. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn select(&mut self, option_index: usize) -> Result<bool, ProgressStoreError> {
        let catalog = Arc::clone(&self.catalog);
        let Some(question) = self.current_in(catalog.as_ref()) else {
            return Ok(false);
        };
        if !question.has_option(option_index) || self.is_submitted(&question.id) {
            return Ok(false);
        }
        self.store
            .apply_selection(&question.id, option_index, question.kind)
            .await
    }

    /// Grade the current question.
    ///
    /// Returns the outcome, or `None` when there was nothing to grade.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn submit(&mut self) -> Result<Option<bool>, ProgressStoreError> {
        let catalog = Arc::clone(&self.catalog);
        let Some(question) = self.current_in(catalog.as_ref()) else {
            return Ok(None);
        };
        let gradable = self
            .store
            .progress()
            .result(&question.id)
            .is_some_and(|r| !r.submitted() && r.has_selection());
        if !gradable {
            return Ok(None);
        }

        let context = if self.review_mode {
            AnswerContext::Review
        } else {
            AnswerContext::Normal
        };
        self.store.apply_submission(question, context).await
    }

    /// Advance, or finish the pass when already on the last question.
    ///
    /// Finishing shows results and leaves review mode; the quiz is marked
    /// completed only when the finished pass was not a review.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn next(&mut self) -> Result<(), ProgressStoreError> {
        if self.active_quiz.is_none() || self.showing_results {
            return Ok(());
        }

        let len = self.visible_questions().len();
        if self.cursor + 1 < len {
            self.cursor += 1;
            return self.mirror_cursor().await;
        }

        let finished_review = self.review_mode;
        self.showing_results = true;
        self.review_mode = false;
        if !finished_review {
            if let Some(quiz) = &self.active_quiz {
                self.store.mark_quiz_completed(quiz).await?;
            }
        }
        Ok(())
    }

    /// Step back one question; does nothing at the first one.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn previous(&mut self) -> Result<(), ProgressStoreError> {
        if self.active_quiz.is_none() || self.showing_results || self.cursor == 0 {
            return Ok(());
        }
        self.cursor -= 1;
        self.mirror_cursor().await
    }

    /// Walk through the active quiz's mistakes from the start.
    pub fn start_review(&mut self) {
        if self.active_quiz.is_none() {
            return;
        }
        self.cursor = 0;
        self.showing_results = false;
        self.review_mode = true;
    }

    /// Leave review mode for the results screen without completing anything.
    pub fn stop_review(&mut self) {
        if !self.review_mode {
            return;
        }
        self.review_mode = false;
        self.showing_results = true;
    }

    /// Clear the active quiz's answers and start it again from the top.
    ///
    /// Other quizzes, the running totals and completion flags are untouched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if the local write fails.
    pub async fn restart(&mut self) -> Result<(), ProgressStoreError> {
        let Some(quiz) = self.active_quiz.clone() else {
            return Ok(());
        };
        let ids: Vec<QuestionId> = self
            .catalog
            .questions_for(&quiz)
            .iter()
            .map(|q| q.id.clone())
            .collect();

        self.cursor = 0;
        self.review_mode = false;
        self.showing_results = false;
        self.explanations.clear();

        self.store.reset_quiz(&quiz, &ids).await?;
        Ok(())
    }

    /// Fetch (once) an AI explanation for the current, already graded question.
    ///
    /// Returns the cached text; `None` when there is no graded question.
    pub async fn ask_explanation(&mut self, explainer: &dyn Explainer) -> Option<&str> {
        let catalog = Arc::clone(&self.catalog);
        let question = self.current_in(catalog.as_ref())?;
        let result = self.store.progress().result(&question.id)?;
        if !result.submitted() {
            return None;
        }

        if !self.explanations.contains_key(&question.id) {
            let selected = question.labels_for(result.selected_indices());
            let text = explainer.explain(question, &selected).await;
            self.explanations.insert(question.id.clone(), text);
        }
        self.explanations.get(&question.id).map(String::as_str)
    }

    fn visible_in<'a>(&self, catalog: &'a dyn QuestionCatalog) -> Vec<&'a Question> {
        let Some(quiz) = &self.active_quiz else {
            return Vec::new();
        };
        let all = catalog.questions_for(quiz);
        if !self.review_mode {
            return all.iter().collect();
        }
        let progress = self.store.progress();
        all.iter()
            .filter(|q| progress.result(&q.id).is_some_and(QuestionResult::is_mistake))
            .collect()
    }

    fn current_in<'a>(&self, catalog: &'a dyn QuestionCatalog) -> Option<&'a Question> {
        if self.showing_results {
            return None;
        }
        self.visible_in(catalog).get(self.cursor).copied()
    }

    fn is_submitted(&self, question_id: &QuestionId) -> bool {
        self.store
            .progress()
            .result(question_id)
            .is_some_and(QuestionResult::submitted)
    }

    async fn mirror_cursor(&mut self) -> Result<(), ProgressStoreError> {
        if self.review_mode || self.showing_results {
            return Ok(());
        }
        if let Some(quiz) = &self.active_quiz {
            self.store.record_cursor(quiz, self.cursor).await?;
        }
        Ok(())
    }
}

fn resume_index(quiz_id: &QuizId, questions: &[Question], progress: &UserProgress) -> usize {
    if let Some(stored) = progress.last_index(quiz_id) {
        return stored.min(questions.len().saturating_sub(1));
    }
    questions
        .iter()
        .position(|q| !progress.result(&q.id).is_some_and(QuestionResult::submitted))
        .unwrap_or(0)
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("active_quiz", &self.active_quiz)
            .field("cursor", &self.cursor)
            .field("review_mode", &self.review_mode)
            .field("showing_results", &self.showing_results)
            .field("explanations_len", &self.explanations.len())
            .finish_non_exhaustive()
    }
}
