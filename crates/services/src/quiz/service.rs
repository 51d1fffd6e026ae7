use chrono::{DateTime, Utc};
use std::fmt;

use learn_core::model::{Chapter, ChapterId, ChapterResult, CourseId, Question};
use learn_core::{QuestionOutcome, QuizSession, Score};
use storage::repository::ChapterResultId;

use super::progress::QuizProgress;
use crate::error::QuizServiceError;

//
// ─── CHAPTER QUIZ ──────────────────────────────────────────────────────────────
//

/// One visit to a chapter: its reading content plus a fresh quiz session.
///
/// The session shares the chapter's question slice; nothing is copied.
pub struct ChapterQuiz {
    chapter_id: ChapterId,
    course_id: CourseId,
    title: String,
    content: String,
    session: QuizSession,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    result_id: Option<ChapterResultId>,
}

impl ChapterQuiz {
    /// Start a quiz over the chapter's questions.
    ///
    /// `started_at` should come from the services layer clock.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz(QuizError::Empty)` if the chapter has no questions.
    pub fn new(chapter: &Chapter, started_at: DateTime<Utc>) -> Result<Self, QuizServiceError> {
        let session = QuizSession::new(chapter.shared_questions())?;
        Ok(Self {
            chapter_id: chapter.id(),
            course_id: chapter.course_id(),
            title: chapter.title().to_owned(),
            content: chapter.content().to_owned(),
            session,
            started_at,
            completed_at: None,
            result_id: None,
        })
    }

    #[must_use]
    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
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

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        self.session.current_question()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn result_id(&self) -> Option<ChapterResultId> {
        self.result_id
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.session.is_finalized()
    }

    #[must_use]
    pub fn score(&self) -> Option<Score> {
        self.session.score()
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        QuizProgress::from_session(&self.session)
    }

    #[must_use]
    pub fn review(&self) -> Option<Vec<QuestionOutcome<'_>>> {
        self.session.review()
    }

    /// Record free text for the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` once the quiz is submitted.
    pub fn record_answer(&mut self, raw: impl Into<String>) -> Result<(), QuizServiceError> {
        Ok(self.session.record_answer(raw)?)
    }

    /// Record the text of the `number`-th (1-based) choice of a multiple-choice question.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::InvalidChoice` when the question has no such choice.
    pub fn choose(&mut self, number: usize) -> Result<(), QuizServiceError> {
        let question = self.session.current_question();
        let available = question.choices().len();
        let choice = number
            .checked_sub(1)
            .and_then(|i| question.choices().get(i))
            .cloned()
            .ok_or(QuizServiceError::InvalidChoice { number, available })?;
        self.record_answer(choice)
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` when the session rejects the move.
    pub fn advance(&mut self) -> Result<(), QuizServiceError> {
        Ok(self.session.advance()?)
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` when the session rejects the move.
    pub fn retreat(&mut self) -> Result<(), QuizServiceError> {
        Ok(self.session.retreat()?)
    }

    pub(crate) fn submit_at(&mut self, completed_at: DateTime<Utc>) -> Result<Score, QuizServiceError> {
        let score = self.session.submit()?;
        self.completed_at = Some(completed_at);
        Ok(score)
    }

    pub(crate) fn build_result(&self) -> Result<ChapterResult, QuizServiceError> {
        let (Some(score), Some(completed_at)) = (self.session.score(), self.completed_at) else {
            return Err(QuizServiceError::NotFinalized);
        };
        Ok(ChapterResult::from_score(
            self.chapter_id,
            self.course_id,
            self.started_at,
            completed_at,
            &score,
        )?)
    }

    pub(crate) fn set_result_id(&mut self, id: ChapterResultId) {
        self.result_id = Some(id);
    }
}

impl fmt::Debug for ChapterQuiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChapterQuiz")
            .field("chapter_id", &self.chapter_id)
            .field("course_id", &self.course_id)
            .field("cursor", &self.session.cursor())
            .field("total", &self.session.total())
            .field("state", &self.session.state())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .field("result_id", &self.result_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
