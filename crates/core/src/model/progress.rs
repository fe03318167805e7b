use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::{QuestionId, QuizId};
use super::question::{Question, QuestionType};

/// Whether a submission counts toward the running totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerContext {
    /// First pass through a quiz; submissions update `score` and `total_answered`.
    Normal,
    /// Revisiting earlier mistakes; totals are left alone.
    Review,
}

/// Answer state for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionResult {
    selected_indices: Vec<usize>,
    is_correct: bool,
    submitted: bool,
}

impl QuestionResult {
    #[must_use]
    pub fn selected_indices(&self) -> &[usize] {
        &self.selected_indices
    }

    #[must_use]
    pub fn submitted(&self) -> bool {
        self.submitted
    }

    /// Grading outcome; `None` until the answer has been submitted.
    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.submitted.then_some(self.is_correct)
    }

    /// True unless the question was submitted and graded correct.
    ///
    /// Unsubmitted results count as mistakes so that review mode also picks up
    /// questions that were started but never graded.
    #[must_use]
    pub fn is_mistake(&self) -> bool {
        !(self.submitted && self.is_correct)
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        !self.selected_indices.is_empty()
    }
}

/// Root aggregate of everything the user has done, across all quizzes.
///
/// Serialized as camelCase JSON; missing fields fall back to their defaults so
/// older snapshots keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProgress {
    score: u32,
    total_answered: u32,
    results: BTreeMap<QuestionId, QuestionResult>,
    completed_quizzes: Vec<QuizId>,
    last_indices: BTreeMap<QuizId, usize>,
}

impl UserProgress {
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_answered(&self) -> u32 {
        self.total_answered
    }

    #[must_use]
    pub fn results(&self) -> &BTreeMap<QuestionId, QuestionResult> {
        &self.results
    }

    #[must_use]
    pub fn result(&self, question_id: &QuestionId) -> Option<&QuestionResult> {
        self.results.get(question_id)
    }

    #[must_use]
    pub fn completed_quizzes(&self) -> &[QuizId] {
        &self.completed_quizzes
    }

    #[must_use]
    pub fn is_completed(&self, quiz_id: &QuizId) -> bool {
        self.completed_quizzes.contains(quiz_id)
    }

    #[must_use]
    pub fn last_indices(&self) -> &BTreeMap<QuizId, usize> {
        &self.last_indices
    }

    #[must_use]
    pub fn last_index(&self, quiz_id: &QuizId) -> Option<usize> {
        self.last_indices.get(quiz_id).copied()
    }

    /// Select (or toggle) an option for a question.
    ///
    /// Single-choice questions replace the selection; multi-select questions
    /// toggle membership. Submitted answers are frozen. Returns whether the
    /// stored state changed.
    pub fn apply_selection(
        &mut self,
        question_id: &QuestionId,
        option_index: usize,
        kind: QuestionType,
    ) -> bool {
        if let Some(existing) = self.results.get(question_id) {
            if existing.submitted {
                return false;
            }
        }

        let result = self.results.entry(question_id.clone()).or_default();
        let before = result.clone();

        match kind {
            QuestionType::Single => {
                result.selected_indices = vec![option_index];
            }
            QuestionType::Multiple => {
                if let Some(pos) = result
                    .selected_indices
                    .iter()
                    .position(|&idx| idx == option_index)
                {
                    result.selected_indices.remove(pos);
                } else {
                    result.selected_indices.push(option_index);
                }
            }
        }
        result.submitted = false;
        result.is_correct = false;

        *result != before
    }

    /// Grade the current selection for `question`.
    ///
    /// Returns the grading outcome, or `None` when there is nothing to grade
    /// (no selection, or already submitted). Only `AnswerContext::Normal`
    /// submissions move `total_answered` and `score`.
    pub fn apply_submission(
        &mut self,
        question: &Question,
        context: AnswerContext,
    ) -> Option<bool> {
        let result = self.results.get_mut(&question.id)?;
        if result.submitted || result.selected_indices.is_empty() {
            return None;
        }

        let is_correct = question.is_correct_selection(&result.selected_indices);
        result.submitted = true;
        result.is_correct = is_correct;

        if context == AnswerContext::Normal {
            self.total_answered = self.total_answered.saturating_add(1);
            if is_correct {
                self.score = self.score.saturating_add(1);
            }
        }

        Some(is_correct)
    }

    /// Returns whether the quiz was newly marked completed.
    pub fn mark_quiz_completed(&mut self, quiz_id: &QuizId) -> bool {
        if self.completed_quizzes.contains(quiz_id) {
            return false;
        }
        self.completed_quizzes.push(quiz_id.clone());
        true
    }

    /// Returns whether the stored cursor changed.
    pub fn record_cursor(&mut self, quiz_id: &QuizId, index: usize) -> bool {
        if self.last_indices.get(quiz_id) == Some(&index) {
            return false;
        }
        self.last_indices.insert(quiz_id.clone(), index);
        true
    }

    /// Forget every answer of a quiz and its resume position.
    ///
    /// `score`, `total_answered` and `completed_quizzes` are left untouched.
    /// Returns whether anything was removed.
    pub fn reset_quiz(&mut self, quiz_id: &QuizId, question_ids: &[QuestionId]) -> bool {
        let mut changed = false;
        for id in question_ids {
            changed |= self.results.remove(id).is_some();
        }
        changed |= self.last_indices.remove(quiz_id).is_some();
        changed
    }
}

/// Remote copy of `UserProgress` where any top-level field may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_answered: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<BTreeMap<QuestionId, QuestionResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_quizzes: Option<Vec<QuizId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_indices: Option<BTreeMap<QuizId, usize>>,
}

impl From<&UserProgress> for ProgressPatch {
    fn from(progress: &UserProgress) -> Self {
        Self {
            score: Some(progress.score),
            total_answered: Some(progress.total_answered),
            results: Some(progress.results.clone()),
            completed_quizzes: Some(progress.completed_quizzes.clone()),
            last_indices: Some(progress.last_indices.clone()),
        }
    }
}

/// Overlay a remote snapshot on the local one.
///
/// Every top-level field present remotely replaces the local field wholesale;
/// fields the remote lacks keep their local value. Maps are not merged key by
/// key.
#[must_use]
pub fn merge(local: &UserProgress, remote: &ProgressPatch) -> UserProgress {
    UserProgress {
        score: remote.score.unwrap_or(local.score),
        total_answered: remote.total_answered.unwrap_or(local.total_answered),
        results: remote
            .results
            .clone()
            .unwrap_or_else(|| local.results.clone()),
        completed_quizzes: remote
            .completed_quizzes
            .clone()
            .unwrap_or_else(|| local.completed_quizzes.clone()),
        last_indices: remote
            .last_indices
            .clone()
            .unwrap_or_else(|| local.last_indices.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, kind: QuestionType, correct: Vec<usize>) -> Question {
        Question {
            id: QuestionId::new(id),
            text: format!("Question {id}"),
            kind,
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_indices: correct,
            explanation: None,
            category: "general".into(),
        }
    }

    #[test]
    fn single_choice_replaces_selection() {
        let mut progress = UserProgress::default();
        let id = QuestionId::new("q");
        progress.apply_selection(&id, 2, QuestionType::Single);
        progress.apply_selection(&id, 0, QuestionType::Single);
        assert_eq!(progress.result(&id).unwrap().selected_indices(), &[0]);
    }

    #[test]
    fn multiple_choice_toggles_off() {
        let mut progress = UserProgress::default();
        let id = QuestionId::new("q");
        assert!(progress.apply_selection(&id, 0, QuestionType::Multiple));
        assert!(progress.apply_selection(&id, 0, QuestionType::Multiple));
        let result = progress.result(&id).unwrap();
        assert!(result.selected_indices().is_empty());
        assert!(!result.submitted());
    }

    #[test]
    fn reselecting_same_single_option_is_not_a_change() {
        let mut progress = UserProgress::default();
        let id = QuestionId::new("q");
        assert!(progress.apply_selection(&id, 1, QuestionType::Single));
        assert!(!progress.apply_selection(&id, 1, QuestionType::Single));
    }

    #[test]
    fn selection_is_frozen_after_submission() {
        let mut progress = UserProgress::default();
        let q = question("q", QuestionType::Multiple, vec![1]);
        progress.apply_selection(&q.id, 1, QuestionType::Multiple);
        assert_eq!(progress.apply_submission(&q, AnswerContext::Normal), Some(true));

        assert!(!progress.apply_selection(&q.id, 0, QuestionType::Multiple));
        let result = progress.result(&q.id).unwrap();
        assert_eq!(result.selected_indices(), &[1]);
        assert_eq!(result.is_correct(), Some(true));
    }

    #[test]
    fn submission_grades_exact_set() {
        let mut progress = UserProgress::default();
        let right = question("right", QuestionType::Multiple, vec![1]);
        let wrong = question("wrong", QuestionType::Multiple, vec![1]);

        progress.apply_selection(&right.id, 1, QuestionType::Multiple);
        progress.apply_selection(&wrong.id, 0, QuestionType::Multiple);
        progress.apply_selection(&wrong.id, 1, QuestionType::Multiple);

        assert_eq!(progress.apply_submission(&right, AnswerContext::Normal), Some(true));
        assert_eq!(progress.apply_submission(&wrong, AnswerContext::Normal), Some(false));
        assert_eq!(progress.score(), 1);
        assert_eq!(progress.total_answered(), 2);
    }

    #[test]
    fn submission_without_selection_is_rejected() {
        let mut progress = UserProgress::default();
        let q = question("q", QuestionType::Multiple, vec![0]);
        assert_eq!(progress.apply_submission(&q, AnswerContext::Normal), None);

        progress.apply_selection(&q.id, 0, QuestionType::Multiple);
        progress.apply_selection(&q.id, 0, QuestionType::Multiple);
        assert_eq!(progress.apply_submission(&q, AnswerContext::Normal), None);
        assert_eq!(progress.total_answered(), 0);
    }

    #[test]
    fn review_submission_leaves_totals() {
        let mut progress = UserProgress::default();
        let q = question("q", QuestionType::Single, vec![0]);
        progress.apply_selection(&q.id, 0, QuestionType::Single);
        assert_eq!(progress.apply_submission(&q, AnswerContext::Review), Some(true));
        assert_eq!(progress.score(), 0);
        assert_eq!(progress.total_answered(), 0);
    }

    #[test]
    fn unsubmitted_result_hides_correctness() {
        let mut progress = UserProgress::default();
        let id = QuestionId::new("q");
        progress.apply_selection(&id, 0, QuestionType::Single);
        let result = progress.result(&id).unwrap();
        assert_eq!(result.is_correct(), None);
        assert!(result.is_mistake());
    }

    #[test]
    fn score_never_exceeds_total_answered() {
        let questions: Vec<Question> = (0..4)
            .map(|i| {
                let kind = if i % 2 == 0 {
                    QuestionType::Single
                } else {
                    QuestionType::Multiple
                };
                question(&format!("q{i}"), kind, vec![i % 3])
            })
            .collect();

        let mut progress = UserProgress::default();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let pick = usize::try_from(seed >> 33).unwrap_or(0);
            let q = &questions[pick % questions.len()];
            match pick % 5 {
                0 => {
                    progress.apply_submission(q, AnswerContext::Normal);
                }
                1 => {
                    progress.apply_submission(q, AnswerContext::Review);
                }
                2 => {
                    let ids: Vec<_> = questions.iter().map(|q| q.id.clone()).collect();
                    progress.reset_quiz(&QuizId::new("quiz"), &ids[..pick % 4]);
                }
                _ => {
                    progress.apply_selection(&q.id, pick % 3, q.kind);
                }
            }
            assert!(progress.score() <= progress.total_answered());
        }
    }

    #[test]
    fn completion_and_cursor_are_idempotent() {
        let mut progress = UserProgress::default();
        let quiz = QuizId::new("quiz");
        assert!(progress.mark_quiz_completed(&quiz));
        assert!(!progress.mark_quiz_completed(&quiz));
        assert_eq!(progress.completed_quizzes().len(), 1);

        assert!(progress.record_cursor(&quiz, 3));
        assert!(!progress.record_cursor(&quiz, 3));
        assert_eq!(progress.last_index(&quiz), Some(3));
    }

    #[test]
    fn reset_quiz_keeps_totals_and_completion() {
        let mut progress = UserProgress::default();
        let quiz = QuizId::new("quiz");
        let other = QuestionId::new("other");
        let q = question("q", QuestionType::Single, vec![0]);

        progress.apply_selection(&q.id, 0, QuestionType::Single);
        progress.apply_submission(&q, AnswerContext::Normal);
        progress.apply_selection(&other, 1, QuestionType::Single);
        progress.mark_quiz_completed(&quiz);
        progress.record_cursor(&quiz, 1);

        assert!(progress.reset_quiz(&quiz, &[q.id.clone()]));

        assert!(progress.result(&q.id).is_none());
        assert!(progress.result(&other).is_some());
        assert_eq!(progress.last_index(&quiz), None);
        assert!(progress.is_completed(&quiz));
        assert_eq!(progress.score(), 1);
        assert_eq!(progress.total_answered(), 1);
    }

    #[test]
    fn merge_prefers_remote_fields_wholesale() {
        let mut local = UserProgress::default();
        local.apply_selection(&QuestionId::new("local"), 0, QuestionType::Single);
        local.record_cursor(&QuizId::new("quiz"), 4);

        let mut remote = UserProgress::default();
        remote.apply_selection(&QuestionId::new("remote"), 1, QuestionType::Single);
        let patch = ProgressPatch {
            results: Some(remote.results().clone()),
            score: Some(7),
            total_answered: Some(9),
            ..ProgressPatch::default()
        };

        let merged = merge(&local, &patch);
        assert_eq!(merged.score(), 7);
        assert_eq!(merged.total_answered(), 9);
        assert!(merged.result(&QuestionId::new("local")).is_none());
        assert!(merged.result(&QuestionId::new("remote")).is_some());
        assert_eq!(merged.last_index(&QuizId::new("quiz")), Some(4));
    }

    #[test]
    fn merge_with_full_patch_equals_remote() {
        let local = UserProgress::default();
        let mut remote = UserProgress::default();
        remote.mark_quiz_completed(&QuizId::new("quiz"));
        assert_eq!(merge(&local, &ProgressPatch::from(&remote)), remote);
    }

    #[test]
    fn json_uses_camel_case_and_tolerates_missing_fields() {
        let json = r#"{"score":1,"totalAnswered":2,"results":{"a":{"selectedIndices":[0],"isCorrect":true,"submitted":true}},"completedQuizzes":["quiz"]}"#;
        let progress: UserProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.score(), 1);
        assert_eq!(progress.total_answered(), 2);
        assert!(progress.last_indices().is_empty());
        assert_eq!(
            progress.result(&QuestionId::new("a")).unwrap().is_correct(),
            Some(true)
        );

        let out = serde_json::to_value(&progress).unwrap();
        assert!(out.get("lastIndices").is_some());
        assert!(out.get("completedQuizzes").is_some());
    }
}
