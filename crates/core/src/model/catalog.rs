use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{QuestionId, QuizId};
use super::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate quiz id: {0}")]
    DuplicateQuiz(QuizId),

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),

    #[error("question {0} has no options")]
    NoOptions(QuestionId),

    #[error("question {0} has no correct options")]
    NoCorrectOptions(QuestionId),

    #[error("question {id} marks option {index} correct but has {len} options")]
    CorrectIndexOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },
}

/// Listing entry for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizMetadata {
    pub id: QuizId,
    pub title: String,
    pub description: String,
    pub question_count: usize,
}

/// A named, ordered collection of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
}

impl Quiz {
    #[must_use]
    pub fn metadata(&self) -> QuizMetadata {
        QuizMetadata {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            question_count: self.questions.len(),
        }
    }
}

/// Read-only source of quizzes and their questions.
pub trait QuestionCatalog: Send + Sync {
    /// All quizzes in display order.
    fn list_quizzes(&self) -> Vec<QuizMetadata>;

    /// Ordered questions for a quiz; empty when the quiz is unknown.
    fn questions_for(&self, quiz_id: &QuizId) -> &[Question];
}

/// Validated in-memory question bank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    quizzes: Vec<Quiz>,
}

impl Catalog {
    /// Build a catalog, checking ids and answer keys.
    ///
    /// Question ids must be unique across the whole catalog because progress is
    /// keyed by question id alone.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on duplicate ids, empty option lists, empty answer
    /// keys, or answer indices outside the option list.
    pub fn new(quizzes: Vec<Quiz>) -> Result<Self, CatalogError> {
        let mut quiz_ids = HashSet::new();
        let mut question_ids = HashSet::new();

        for quiz in &quizzes {
            if !quiz_ids.insert(quiz.id.clone()) {
                return Err(CatalogError::DuplicateQuiz(quiz.id.clone()));
            }
            for question in &quiz.questions {
                if !question_ids.insert(question.id.clone()) {
                    return Err(CatalogError::DuplicateQuestion(question.id.clone()));
                }
                validate_question(question)?;
            }
        }

        Ok(Self { quizzes })
    }

    #[must_use]
    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    #[must_use]
    pub fn quiz(&self, id: &QuizId) -> Option<&Quiz> {
        self.quizzes.iter().find(|quiz| &quiz.id == id)
    }
}

fn validate_question(question: &Question) -> Result<(), CatalogError> {
    if question.options.is_empty() {
        return Err(CatalogError::NoOptions(question.id.clone()));
    }
    if question.correct_indices.is_empty() {
        return Err(CatalogError::NoCorrectOptions(question.id.clone()));
    }
    let len = question.options.len();
    if let Some(&index) = question.correct_indices.iter().find(|&&idx| idx >= len) {
        return Err(CatalogError::CorrectIndexOutOfRange {
            id: question.id.clone(),
            index,
            len,
        });
    }
    Ok(())
}

impl QuestionCatalog for Catalog {
    fn list_quizzes(&self) -> Vec<QuizMetadata> {
        self.quizzes.iter().map(Quiz::metadata).collect()
    }

    fn questions_for(&self, quiz_id: &QuizId) -> &[Question] {
        self.quiz(quiz_id)
            .map(|quiz| quiz.questions.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionType;

    fn question(id: &str, correct: Vec<usize>) -> Question {
        Question {
            id: QuestionId::new(id),
            text: format!("Question {id}"),
            kind: QuestionType::Single,
            options: vec!["yes".into(), "no".into()],
            correct_indices: correct,
            explanation: None,
            category: "basics".into(),
        }
    }

    fn quiz(id: &str, questions: Vec<Question>) -> Quiz {
        Quiz {
            id: QuizId::new(id),
            title: format!("Quiz {id}"),
            description: String::new(),
            questions,
        }
    }

    #[test]
    fn lists_metadata_in_order() {
        let catalog = Catalog::new(vec![
            quiz("q1", vec![question("a", vec![0]), question("b", vec![1])]),
            quiz("q2", vec![question("c", vec![0])]),
        ])
        .unwrap();

        let listing = catalog.list_quizzes();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, QuizId::new("q1"));
        assert_eq!(listing[0].question_count, 2);
        assert_eq!(listing[1].question_count, 1);
    }

    #[test]
    fn unknown_quiz_has_no_questions() {
        let catalog = Catalog::new(vec![quiz("q1", vec![question("a", vec![0])])]).unwrap();
        assert!(catalog.questions_for(&QuizId::new("missing")).is_empty());
    }

    #[test]
    fn rejects_question_ids_shared_between_quizzes() {
        let err = Catalog::new(vec![
            quiz("q1", vec![question("a", vec![0])]),
            quiz("q2", vec![question("a", vec![0])]),
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateQuestion(QuestionId::new("a")));
    }

    #[test]
    fn rejects_out_of_range_answer_key() {
        let err = Catalog::new(vec![quiz("q1", vec![question("a", vec![2])])]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::CorrectIndexOutOfRange {
                id: QuestionId::new("a"),
                index: 2,
                len: 2,
            }
        );
    }

    #[test]
    fn rejects_empty_answer_key() {
        let err = Catalog::new(vec![quiz("q1", vec![question("a", vec![])])]).unwrap_err();
        assert_eq!(err, CatalogError::NoCorrectOptions(QuestionId::new("a")));
    }
}
