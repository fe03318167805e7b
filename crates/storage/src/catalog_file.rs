//! Question bank loading from a JSON file.

use std::path::Path;

use quiz_core::{Catalog, CatalogError, Quiz};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogFileError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] CatalogError),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    quizzes: Vec<Quiz>,
}

/// Parse a catalog from JSON text of the form `{ "quizzes": [...] }`.
///
/// # Errors
///
/// Returns `CatalogFileError::Parse` on malformed JSON and
/// `CatalogFileError::Invalid` when the bank fails validation.
pub fn catalog_from_json(json: &str) -> Result<Catalog, CatalogFileError> {
    let file: CatalogFile = serde_json::from_str(json)?;
    Ok(Catalog::new(file.quizzes)?)
}

/// Read and validate the catalog at `path`.
///
/// # Errors
///
/// Returns `CatalogFileError` if the file cannot be read, parsed or validated.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog, CatalogFileError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let catalog = catalog_from_json(&json)?;
    info!(
        path = %path.display(),
        quizzes = catalog.quizzes().len(),
        "loaded question catalog"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::{QuestionCatalog, QuestionType, QuizId};
    use std::io::Write;

    const BANK: &str = r#"{
        "quizzes": [
            {
                "id": "basics",
                "title": "Basics",
                "description": "Warm-up",
                "questions": [
                    {
                        "id": "b1",
                        "text": "Which are tables?",
                        "type": "multiple",
                        "options": ["incident", "sys_user", "banana"],
                        "correctIndices": [0, 1],
                        "category": "Data Model"
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_bank() {
        let catalog = catalog_from_json(BANK).unwrap();
        let questions = catalog.questions_for(&QuizId::new("basics"));
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].kind, QuestionType::Multiple);
        assert_eq!(questions[0].correct_indices, vec![0, 1]);
    }

    #[test]
    fn invalid_bank_is_rejected() {
        let bad = BANK.replace("[0, 1]", "[7]");
        let err = catalog_from_json(&bad).unwrap_err();
        assert!(matches!(err, CatalogFileError::Invalid(_)));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BANK.as_bytes()).unwrap();
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.list_quizzes()[0].title, "Basics");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_catalog("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CatalogFileError::Io(_)));
    }
}
