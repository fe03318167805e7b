#![forbid(unsafe_code)]

pub mod model;
pub mod time;

pub use model::{
    AnswerContext, Catalog, CatalogError, ProgressPatch, Question, QuestionCatalog, QuestionId,
    QuestionResult, QuestionType, Quiz, QuizId, QuizMetadata, QuizSummary, UserProgress, merge,
};
pub use time::Clock;
