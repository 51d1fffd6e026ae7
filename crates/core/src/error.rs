use thiserror::Error;

use crate::model::{ChapterError, ChapterResultError, CourseError, QuestionError};
use crate::quiz::QuizError;

/// Umbrella error for every domain rule in this crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Chapter(#[from] ChapterError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    ChapterResult(#[from] ChapterResultError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}
