use quiz_core::QuizMetadata;

/// Dashboard card for a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardEntry {
    pub quiz: QuizMetadata,
    pub completed: bool,
}
