use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{ChapterId, CourseId};
use crate::quiz::Score;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChapterResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("a chapter result needs at least one question")]
    NoQuestions,

    #[error("correct count ({correct}) exceeds total questions ({total})")]
    CountMismatch { correct: u32, total: u32 },

    #[error("question count {0} does not fit a stored result")]
    CountOverflow(usize),
}

/// Outcome of one finalized chapter quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterResult {
    chapter_id: ChapterId,
    course_id: CourseId,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_questions: u32,
    correct_count: u32,
}

impl ChapterResult {
    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ChapterResultError` if the time range or counts are inconsistent.
    pub fn from_persisted(
        chapter_id: ChapterId,
        course_id: CourseId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_questions: u32,
        correct_count: u32,
    ) -> Result<Self, ChapterResultError> {
        if completed_at < started_at {
            return Err(ChapterResultError::InvalidTimeRange);
        }
        if total_questions == 0 {
            return Err(ChapterResultError::NoQuestions);
        }
        if correct_count > total_questions {
            return Err(ChapterResultError::CountMismatch {
                correct: correct_count,
                total: total_questions,
            });
        }

        Ok(Self {
            chapter_id,
            course_id,
            started_at,
            completed_at,
            total_questions,
            correct_count,
        })
    }

    /// Build a result from a finalized quiz score.
    ///
    /// # Errors
    ///
    /// Returns `ChapterResultError::InvalidTimeRange` if `completed_at` is before `started_at`,
    /// or `ChapterResultError::CountOverflow` if a count exceeds `u32`.
    pub fn from_score(
        chapter_id: ChapterId,
        course_id: CourseId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        score: &Score,
    ) -> Result<Self, ChapterResultError> {
        let total = stored_count(score.total())?;
        let correct = stored_count(score.correct())?;
        Self::from_persisted(chapter_id, course_id, started_at, completed_at, total, correct)
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
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    /// Unrounded percentage in [0, 100].
    #[must_use]
    pub fn score(&self) -> f64 {
        f64::from(self.correct_count) / f64::from(self.total_questions) * 100.0
    }

    /// Whole-number percentage for display.
    #[must_use]
    pub fn rounded_percent(&self) -> u32 {
        self.score().round() as u32
    }
}

fn stored_count(count: usize) -> Result<u32, ChapterResultError> {
    u32::try_from(count).map_err(|_| ChapterResultError::CountOverflow(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn score_uses_real_division() {
        let now = fixed_now();
        let result = ChapterResult::from_persisted(
            ChapterId::new(1),
            CourseId::new(1),
            now,
            now + Duration::minutes(3),
            3,
            2,
        )
        .unwrap();
        assert!((result.score() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.rounded_percent(), 67);
    }

    #[test]
    fn rejects_inconsistent_rows() {
        let now = fixed_now();
        let c = ChapterId::new(1);
        let k = CourseId::new(1);
        assert_eq!(
            ChapterResult::from_persisted(c, k, now, now - Duration::seconds(1), 3, 1).unwrap_err(),
            ChapterResultError::InvalidTimeRange
        );
        assert_eq!(
            ChapterResult::from_persisted(c, k, now, now, 0, 0).unwrap_err(),
            ChapterResultError::NoQuestions
        );
        assert_eq!(
            ChapterResult::from_persisted(c, k, now, now, 2, 3).unwrap_err(),
            ChapterResultError::CountMismatch {
                correct: 3,
                total: 2
            }
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_counts_are_rejected() {
        let too_many = u32::MAX as usize + 1;
        assert_eq!(
            stored_count(too_many).unwrap_err(),
            ChapterResultError::CountOverflow(too_many)
        );
        assert_eq!(stored_count(3).unwrap(), 3);
    }
}
