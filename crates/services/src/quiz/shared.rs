use std::sync::Arc;

use tokio::sync::Mutex;

use super::progress::QuizProgress;
use super::service::ChapterQuiz;
use super::workflow::{QuizLoopService, SubmitOutcome};
use crate::error::QuizServiceError;

/// Cloneable handle to one quiz that several callers may drive.
///
/// Every operation takes the same lock, so mutations are serialized and each
/// one is applied in full or not at all.
#[derive(Clone)]
pub struct SharedQuiz {
    service: QuizLoopService,
    quiz: Arc<Mutex<ChapterQuiz>>,
}

impl SharedQuiz {
    #[must_use]
    pub fn new(service: QuizLoopService, quiz: ChapterQuiz) -> Self {
        Self {
            service,
            quiz: Arc::new(Mutex::new(quiz)),
        }
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` once the quiz is submitted.
    pub async fn record_answer(&self, raw: impl Into<String>) -> Result<(), QuizServiceError> {
        let mut quiz = self.quiz.lock().await;
        self.service.record_answer(&mut quiz, raw)
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError` when the choice or the session rejects it.
    pub async fn choose(&self, number: usize) -> Result<(), QuizServiceError> {
        let mut quiz = self.quiz.lock().await;
        self.service.choose(&mut quiz, number)
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` when the session rejects the move.
    pub async fn advance(&self) -> Result<(), QuizServiceError> {
        let mut quiz = self.quiz.lock().await;
        self.service.advance(&mut quiz)
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` when the session rejects the move.
    pub async fn retreat(&self) -> Result<(), QuizServiceError> {
        let mut quiz = self.quiz.lock().await;
        self.service.retreat(&mut quiz)
    }

    /// Submit and persist. The lock is held until the result is stored.
    ///
    /// # Errors
    ///
    /// See [`QuizLoopService::submit`].
    pub async fn submit(&self) -> Result<SubmitOutcome, QuizServiceError> {
        let mut quiz = self.quiz.lock().await;
        self.service.submit(&mut quiz).await
    }

    pub async fn progress(&self) -> QuizProgress {
        self.quiz.lock().await.progress()
    }

    /// Run `f` against a consistent snapshot of the quiz.
    pub async fn read<R>(&self, f: impl FnOnce(&ChapterQuiz) -> R) -> R {
        let quiz = self.quiz.lock().await;
        f(&quiz)
    }
}
