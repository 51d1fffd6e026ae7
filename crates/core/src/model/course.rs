use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{ChapterId, CourseId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("chapter {0} appears more than once in the outline")]
    DuplicateChapter(ChapterId),

    #[error("outline entry title cannot be empty")]
    EmptyEntryTitle,
}

//
// ─── OUTLINE ───────────────────────────────────────────────────────────────────
//

/// One chapter slot in a course outline, grouped under a section and unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub chapter_id: ChapterId,
    pub title: String,
    pub section: String,
    pub unit: String,
    pub duration_minutes: u32,
}

impl OutlineEntry {
    #[must_use]
    pub fn new(
        chapter_id: ChapterId,
        title: impl Into<String>,
        section: impl Into<String>,
        unit: impl Into<String>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            chapter_id,
            title: title.into(),
            section: section.into(),
            unit: unit.into(),
            duration_minutes,
        }
    }
}

/// Where a chapter stands for the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    /// At least one finalized attempt exists.
    Completed,
    /// Every earlier chapter is completed; this one is open.
    Current,
    /// Some earlier chapter is still open.
    Locked,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    instructor: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    outline: Vec<OutlineEntry>,
}

impl Course {
    /// Creates a course with its ordered chapter outline.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` for a blank title, blank outline entries, or a chapter listed twice.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        instructor: impl Into<String>,
        description: Option<String>,
        created_at: DateTime<Utc>,
        outline: Vec<OutlineEntry>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        let mut seen = HashSet::with_capacity(outline.len());
        for entry in &outline {
            if entry.title.trim().is_empty() {
                return Err(CourseError::EmptyEntryTitle);
            }
            if !seen.insert(entry.chapter_id) {
                return Err(CourseError::DuplicateChapter(entry.chapter_id));
            }
        }

        Ok(Self {
            id,
            title,
            instructor: instructor.into(),
            description: description.filter(|d| !d.trim().is_empty()),
            created_at,
            outline,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn instructor(&self) -> &str {
        &self.instructor
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn outline(&self) -> &[OutlineEntry] {
        &self.outline
    }

    #[must_use]
    pub fn total_minutes(&self) -> u32 {
        self.outline
            .iter()
            .fold(0_u32, |acc, e| acc.saturating_add(e.duration_minutes))
    }

    /// Status of every outline entry, in outline order.
    ///
    /// A chapter is `Completed` when `is_completed` says so. Otherwise it is `Current`
    /// only if every chapter before it is completed.
    pub fn chapter_statuses<F>(&self, is_completed: F) -> Vec<ChapterStatus>
    where
        F: Fn(ChapterId) -> bool,
    {
        let mut all_prior_completed = true;
        self.outline
            .iter()
            .map(|entry| {
                if is_completed(entry.chapter_id) {
                    ChapterStatus::Completed
                } else if all_prior_completed {
                    all_prior_completed = false;
                    ChapterStatus::Current
                } else {
                    ChapterStatus::Locked
                }
            })
            .collect()
    }

    /// Percentage of outline chapters completed, in [0, 100]. Zero for an empty outline.
    pub fn progress_percent<F>(&self, is_completed: F) -> f64
    where
        F: Fn(ChapterId) -> bool,
    {
        if self.outline.is_empty() {
            return 0.0;
        }
        let done = self
            .outline
            .iter()
            .filter(|e| is_completed(e.chapter_id))
            .count();
        done as f64 / self.outline.len() as f64 * 100.0
    }

    /// First outline entry not yet completed.
    pub fn next_chapter<F>(&self, is_completed: F) -> Option<&OutlineEntry>
    where
        F: Fn(ChapterId) -> bool,
    {
        self.outline.iter().find(|e| !is_completed(e.chapter_id))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn course(ids: &[u64]) -> Course {
        let outline = ids
            .iter()
            .map(|id| OutlineEntry::new(ChapterId::new(*id), format!("Chapter {id}"), "S", "U", 20))
            .collect();
        Course::new(
            CourseId::new(1),
            "React Fundamentals",
            "John Doe",
            None,
            fixed_now(),
            outline,
        )
        .unwrap()
    }

    #[test]
    fn duplicate_outline_chapter_is_rejected() {
        let outline = vec![
            OutlineEntry::new(ChapterId::new(1), "a", "S", "U", 5),
            OutlineEntry::new(ChapterId::new(1), "b", "S", "U", 5),
        ];
        let err = Course::new(CourseId::new(1), "C", "I", None, fixed_now(), outline).unwrap_err();
        assert_eq!(err, CourseError::DuplicateChapter(ChapterId::new(1)));
    }

    #[test]
    fn statuses_unlock_only_the_first_open_chapter() {
        let course = course(&[1, 2, 3, 4]);
        let done = [1_u64];
        let statuses = course.chapter_statuses(|id| done.contains(&id.value()));
        assert_eq!(
            statuses,
            vec![
                ChapterStatus::Completed,
                ChapterStatus::Current,
                ChapterStatus::Locked,
                ChapterStatus::Locked,
            ]
        );
    }

    #[test]
    fn completing_out_of_order_keeps_later_gaps_locked() {
        let course = course(&[1, 2, 3]);
        let done = [1_u64, 3];
        let statuses = course.chapter_statuses(|id| done.contains(&id.value()));
        assert_eq!(
            statuses,
            vec![
                ChapterStatus::Completed,
                ChapterStatus::Current,
                ChapterStatus::Completed,
            ]
        );
    }

    #[test]
    fn progress_and_next_chapter() {
        let course = course(&[1, 2, 3, 4]);
        let done = [1_u64, 2];
        assert!((course.progress_percent(|id| done.contains(&id.value())) - 50.0).abs() < 1e-9);
        assert_eq!(
            course
                .next_chapter(|id| done.contains(&id.value()))
                .map(|e| e.chapter_id),
            Some(ChapterId::new(3))
        );
        assert_eq!(course.total_minutes(), 80);
    }

    #[test]
    fn empty_outline_has_zero_progress() {
        let course = course(&[]);
        assert_eq!(course.progress_percent(|_| true), 0.0);
        assert!(course.next_chapter(|_| false).is_none());
    }
}
