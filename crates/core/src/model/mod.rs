mod catalog;
mod ids;
mod progress;
mod question;
mod summary;

pub use ids::{QuestionId, QuizId};

pub use catalog::{Catalog, CatalogError, QuestionCatalog, Quiz, QuizMetadata};
pub use progress::{AnswerContext, ProgressPatch, QuestionResult, UserProgress, merge};
pub use question::{Question, QuestionType};
pub use summary::{QuizSummary, percent};
