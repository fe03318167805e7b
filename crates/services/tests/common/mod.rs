#![allow(dead_code)]

use std::sync::Arc;

use quiz_core::{Catalog, Question, QuestionCatalog, QuestionId, QuestionType, Quiz, QuizId};

pub fn question(id: &str, kind: QuestionType, correct: Vec<usize>) -> Question {
    Question {
        id: QuestionId::new(id),
        text: format!("Question {id}"),
        kind,
        options: vec!["zero".into(), "one".into(), "two".into()],
        correct_indices: correct,
        explanation: Some(format!("Because {id}.")),
        category: "Platform".into(),
    }
}

pub fn quiz(id: &str, questions: Vec<Question>) -> Quiz {
    Quiz {
        id: QuizId::new(id),
        title: format!("Quiz {id}"),
        description: String::new(),
        questions,
    }
}

/// Q1 = [A, B] and Q2 = [C], all single-choice with option 0 correct.
pub fn catalog() -> Arc<dyn QuestionCatalog> {
    Arc::new(
        Catalog::new(vec![
            quiz(
                "Q1",
                vec![
                    question("A", QuestionType::Single, vec![0]),
                    question("B", QuestionType::Single, vec![0]),
                ],
            ),
            quiz("Q2", vec![question("C", QuestionType::Multiple, vec![0, 2])]),
        ])
        .expect("valid catalog"),
    )
}
