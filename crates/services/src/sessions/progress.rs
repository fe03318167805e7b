use quiz_core::model::percent;

/// Where the cursor sits within the visible question sequence, for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPosition {
    /// 1-based position of the current question.
    pub current: usize,
    pub total: usize,
    pub review: bool,
}

impl SessionPosition {
    #[must_use]
    pub fn percent(&self) -> u32 {
        percent(self.current, self.total)
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current == self.total
    }
}
