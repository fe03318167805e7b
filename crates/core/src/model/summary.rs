use super::progress::UserProgress;
use super::question::Question;

/// End-of-quiz tally shown on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSummary {
    pub correct: usize,
    pub total: usize,
    pub mistakes: usize,
    pub accuracy_percent: u32,
}

impl QuizSummary {
    /// Tally a quiz's questions against the stored results.
    ///
    /// Unanswered questions count as mistakes.
    #[must_use]
    pub fn compute(questions: &[Question], progress: &UserProgress) -> Self {
        let total = questions.len();
        let correct = questions
            .iter()
            .filter(|q| {
                progress
                    .result(&q.id)
                    .and_then(|r| r.is_correct())
                    .unwrap_or(false)
            })
            .count();

        Self {
            correct,
            total,
            mistakes: total - correct,
            accuracy_percent: percent(correct, total),
        }
    }

    #[must_use]
    pub fn is_flawless(&self) -> bool {
        self.total > 0 && self.mistakes == 0
    }

    #[must_use]
    pub fn has_mistakes(&self) -> bool {
        self.mistakes > 0
    }
}

/// Rounded percentage of `part` in `whole`; 0 when `whole` is 0.
#[must_use]
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let value = (part * 200 + whole) / (whole * 2);
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerContext, QuestionId, QuestionType};

    fn question(id: &str) -> Question {
        Question {
            id: QuestionId::new(id),
            text: String::new(),
            kind: QuestionType::Single,
            options: vec!["a".into(), "b".into()],
            correct_indices: vec![0],
            explanation: None,
            category: String::new(),
        }
    }

    #[test]
    fn counts_correct_and_rounds_accuracy() {
        let questions = vec![question("a"), question("b"), question("c")];
        let mut progress = UserProgress::default();
        progress.apply_selection(&questions[0].id, 0, QuestionType::Single);
        progress.apply_submission(&questions[0], AnswerContext::Normal);
        progress.apply_selection(&questions[1].id, 0, QuestionType::Single);
        progress.apply_submission(&questions[1], AnswerContext::Normal);
        // selected but never submitted
        progress.apply_selection(&questions[2].id, 0, QuestionType::Single);

        let summary = QuizSummary::compute(&questions, &progress);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.mistakes, 1);
        assert_eq!(summary.accuracy_percent, 67);
        assert!(summary.has_mistakes());
    }

    #[test]
    fn empty_quiz_has_zero_accuracy() {
        let summary = QuizSummary::compute(&[], &UserProgress::default());
        assert_eq!(summary.accuracy_percent, 0);
        assert!(!summary.is_flawless());
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(2, 3), 67);
    }
}
