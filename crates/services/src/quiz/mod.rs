mod progress;
mod service;
mod shared;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::QuizServiceError;
pub use progress::QuizProgress;
pub use service::ChapterQuiz;
pub use shared::SharedQuiz;
pub use workflow::{QuizLoopService, SubmitOutcome};
