use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::model::ids::{ChapterId, CourseId, QuestionId};
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChapterError {
    #[error("chapter title cannot be empty")]
    EmptyTitle,

    #[error("duplicate question id {0} in chapter")]
    DuplicateQuestionId(QuestionId),
}

/// A unit of course content: reading text followed by an ordered list of questions.
///
/// Questions are held behind an `Arc<[Question]>` so quiz sessions can share them
/// read-only without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    id: ChapterId,
    course_id: CourseId,
    title: String,
    content: String,
    position: u32,
    questions: Arc<[Question]>,
}

impl Chapter {
    /// Build a chapter from validated questions.
    ///
    /// # Errors
    ///
    /// Returns `ChapterError::EmptyTitle` for a blank title and
    /// `ChapterError::DuplicateQuestionId` when two questions share an id.
    pub fn new(
        id: ChapterId,
        course_id: CourseId,
        title: impl Into<String>,
        content: impl Into<String>,
        position: u32,
        questions: Vec<Question>,
    ) -> Result<Self, ChapterError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ChapterError::EmptyTitle);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(ChapterError::DuplicateQuestionId(q.id()));
            }
        }

        Ok(Self {
            id,
            course_id,
            title,
            content: content.into(),
            position,
            questions: questions.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> ChapterId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Paragraphs of the reading text, trimmed, blank lines dropped.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Shared handle to the question list.
    #[must_use]
    pub fn shared_questions(&self) -> Arc<[Question]> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}
