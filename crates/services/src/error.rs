//! Shared error types for the services crate.

use thiserror::Error;

use learn_core::QuizError;
use learn_core::model::{ChapterId, ChapterResultError, CourseId};
use storage::repository::StorageError;
use storage::seed::SeedError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by quiz services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("chapter {0} not found")]
    ChapterNotFound(ChapterId),
    #[error("quiz has not been submitted")]
    NotFinalized,
    #[error("choice {number} is out of range (1-{available})")]
    InvalidChoice { number: usize, available: usize },
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Result(#[from] ChapterResultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizServiceError {
    /// True for rejections the learner can fix by acting differently.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::Quiz(err) => !matches!(err, QuizError::Empty),
            Self::InvalidChoice { .. } => true,
            _ => false,
        }
    }
}

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error("course {0} has no chapter with questions")]
    NoQuizChapter(CourseId),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Seed(#[from] SeedError),
}
