use learn_core::QuizSession;
use serde::Serialize;

/// Aggregated view of quiz progress, useful for a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuizProgress {
    /// 1-based position of the current question.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    /// `position / total * 100`.
    pub percent: f64,
    pub is_finalized: bool,
}

impl QuizProgress {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Self {
        let position = session.cursor() + 1;
        let total = session.total();
        Self {
            position,
            total,
            answered: session.answered_count(),
            percent: position as f64 / total as f64 * 100.0,
            is_finalized: session.is_finalized(),
        }
    }
}
