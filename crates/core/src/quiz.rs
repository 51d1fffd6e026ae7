//! Chapter quiz session: a linear wizard over a fixed list of questions.
//!
//! The session records one raw answer per question index, lets the learner move
//! forward (only past an answered question) and back, and finalizes exactly once
//! on submit, at which point the score is computed by containment grading.
//!
//! Every rejected operation leaves the session untouched and returns a
//! [`QuizError`] describing why.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::model::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("a quiz needs at least one question")]
    Empty,

    #[error("question {} has not been answered", .index + 1)]
    Unanswered { index: usize },

    #[error("already on the last question")]
    AtLastQuestion,

    #[error("already on the first question")]
    AtFirstQuestion,

    #[error("cannot submit from question {}; the quiz ends at question {}", .cursor + 1, .last + 1)]
    NotOnFinalQuestion { cursor: usize, last: usize },

    #[error("quiz already submitted")]
    Finalized,
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// Final tally of a submitted quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    correct: usize,
    total: usize,
}

impl Score {
    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Percentage in [0, 100] using real division. Rounding is left to display code.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64 * 100.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}% ({}/{})", self.percent(), self.correct, self.total)
    }
}

/// Grade every question against the recorded answers.
///
/// A question counts as correct when its answer is present and its lower-cased
/// text contains the lower-cased correct answer. Missing answers are incorrect.
#[must_use]
pub fn score_answers(questions: &[Question], answers: &BTreeMap<usize, String>) -> Score {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(i, q)| answers.get(i).is_some_and(|a| q.accepts(a)))
        .count();

    Score {
        correct,
        total: questions.len(),
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    InProgress,
    Finalized(Score),
}

/// Per-question review available once the quiz is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionOutcome<'a> {
    pub index: usize,
    pub question: &'a Question,
    pub answer: Option<&'a str>,
    pub correct: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner's attempt at one chapter.
///
/// Invariant: `cursor < questions.len()` at all times.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Arc<[Question]>,
    cursor: usize,
    answers: BTreeMap<usize, String>,
    state: QuizState,
}

impl QuizSession {
    /// Start a session over the given questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Empty` when there are no questions.
    pub fn new(questions: Arc<[Question]>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        Ok(Self {
            questions,
            cursor: 0,
            answers: BTreeMap::new(),
            state: QuizState::InProgress,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.cursor]
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.cursor == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor + 1 == self.questions.len()
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        matches!(self.state, QuizState::Finalized(_))
    }

    /// Final score; `None` until the quiz is submitted.
    #[must_use]
    pub fn score(&self) -> Option<Score> {
        match self.state {
            QuizState::Finalized(score) => Some(score),
            QuizState::InProgress => None,
        }
    }

    /// Raw text recorded for a question index, if any.
    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    #[must_use]
    pub fn current_answer(&self) -> Option<&str> {
        self.answer(self.cursor)
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    /// An index counts as answered once it holds non-empty text.
    #[must_use]
    pub fn is_answered(&self, index: usize) -> bool {
        self.answers.get(&index).is_some_and(|a| !a.is_empty())
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_empty()).count()
    }

    /// Record (or overwrite) the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Finalized` after submit.
    pub fn record_answer(&mut self, raw: impl Into<String>) -> Result<(), QuizError> {
        self.ensure_in_progress()?;
        self.answers.insert(self.cursor, raw.into());
        Ok(())
    }

    /// Move to the next question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AtLastQuestion` on the final question and
    /// `QuizError::Unanswered` when the current question has no answer.
    pub fn advance(&mut self) -> Result<(), QuizError> {
        self.ensure_in_progress()?;
        if self.is_last() {
            return Err(QuizError::AtLastQuestion);
        }
        self.ensure_current_answered()?;
        self.cursor += 1;
        Ok(())
    }

    /// Move back one question. Recorded answers are kept.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AtFirstQuestion` on the first question.
    pub fn retreat(&mut self) -> Result<(), QuizError> {
        self.ensure_in_progress()?;
        if self.is_first() {
            return Err(QuizError::AtFirstQuestion);
        }
        self.cursor -= 1;
        Ok(())
    }

    /// Grade the quiz and finalize it. One way; there is no un-submit.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotOnFinalQuestion` unless the cursor is on the last question,
    /// and `QuizError::Unanswered` if that question has no answer.
    pub fn submit(&mut self) -> Result<Score, QuizError> {
        self.ensure_in_progress()?;
        if !self.is_last() {
            return Err(QuizError::NotOnFinalQuestion {
                cursor: self.cursor,
                last: self.questions.len() - 1,
            });
        }
        self.ensure_current_answered()?;

        let score = score_answers(&self.questions, &self.answers);
        self.state = QuizState::Finalized(score);
        Ok(score)
    }

    /// Per-question review, in question order. `None` until submitted so correct
    /// answers never leak into an open attempt.
    #[must_use]
    pub fn review(&self) -> Option<Vec<QuestionOutcome<'_>>> {
        if !self.is_finalized() {
            return None;
        }
        let outcomes = self
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let answer = self.answer(index);
                QuestionOutcome {
                    index,
                    question,
                    answer,
                    correct: answer.is_some_and(|a| question.accepts(a)),
                }
            })
            .collect();
        Some(outcomes)
    }

    fn ensure_in_progress(&self) -> Result<(), QuizError> {
        if self.is_finalized() {
            return Err(QuizError::Finalized);
        }
        Ok(())
    }

    fn ensure_current_answered(&self) -> Result<(), QuizError> {
        if !self.is_answered(self.cursor) {
            return Err(QuizError::Unanswered { index: self.cursor });
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
