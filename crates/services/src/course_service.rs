//! Course catalog, outline and learner progress.
//!
//! Completion is derived from stored chapter results: a chapter with at least one
//! finalized attempt is completed. Views carry raw numbers; formatting is left to
//! the front end.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use learn_core::model::{ChapterId, ChapterStatus, Course, CourseId, OutlineEntry};
use storage::repository::{ChapterResultRepository, ChapterResultRow, CourseRepository};

use crate::error::CourseServiceError;

const COURSE_LIST_LIMIT: u32 = 100;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub title: String,
    pub instructor: String,
    pub description: Option<String>,
    pub chapter_count: usize,
    pub total_minutes: u32,
}

impl CourseSummary {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            id: course.id(),
            title: course.title().to_owned(),
            instructor: course.instructor().to_owned(),
            description: course.description().map(str::to_owned),
            chapter_count: course.outline().len(),
            total_minutes: course.total_minutes(),
        }
    }
}

/// One outline row with the learner's standing on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineItem {
    pub chapter_id: ChapterId,
    pub title: String,
    pub duration_minutes: u32,
    pub status: ChapterStatus,
    pub attempts: usize,
    /// Best unrounded percentage over all attempts.
    pub best_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineUnit {
    pub title: String,
    pub chapters: Vec<OutlineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineSection {
    pub title: String,
    pub units: Vec<OutlineUnit>,
}

/// Course outline grouped by section, then unit, in study order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseOutline {
    pub course: CourseSummary,
    pub sections: Vec<OutlineSection>,
}

impl CourseOutline {
    /// Outline items in study order, ignoring grouping.
    pub fn items(&self) -> impl Iterator<Item = &OutlineItem> {
        self.sections
            .iter()
            .flat_map(|s| s.units.iter())
            .flat_map(|u| u.chapters.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextChapter {
    pub chapter_id: ChapterId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseProgress {
    pub course_id: CourseId,
    pub title: String,
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
    pub next_chapter: Option<NextChapter>,
    /// Mean of every recorded attempt's score in this course.
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerDashboard {
    pub courses: Vec<CourseProgress>,
    pub completed_chapters: usize,
    pub attempts: usize,
    pub average_score: Option<f64>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-side facade over courses and chapter results.
#[derive(Clone)]
pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    results: Arc<dyn ChapterResultRepository>,
}

impl CourseService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        results: Arc<dyn ChapterResultRepository>,
    ) -> Self {
        Self { courses, results }
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` on repository failures.
    pub async fn list_courses(&self) -> Result<Vec<CourseSummary>, CourseServiceError> {
        let courses = self.courses.list_courses(COURSE_LIST_LIMIT).await?;
        Ok(courses.iter().map(CourseSummary::from_course).collect())
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::CourseNotFound` for an unknown course.
    pub async fn course_outline(&self, course_id: CourseId) -> Result<CourseOutline, CourseServiceError> {
        let course = self.load_course(course_id).await?;
        let rows = self.results.list_course_results(course_id).await?;
        let stats = ChapterStats::from_rows(&rows);

        let statuses = course.chapter_statuses(|id| stats.is_completed(id));
        let mut sections: Vec<OutlineSection> = Vec::new();
        for (entry, status) in course.outline().iter().zip(statuses) {
            let item = stats.item(entry, status);
            push_grouped(&mut sections, entry, item);
        }

        Ok(CourseOutline {
            course: CourseSummary::from_course(&course),
            sections,
        })
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::CourseNotFound` for an unknown course.
    pub async fn course_progress(&self, course_id: CourseId) -> Result<CourseProgress, CourseServiceError> {
        let course = self.load_course(course_id).await?;
        let rows = self.results.list_course_results(course_id).await?;
        Ok(progress_for(&course, &rows))
    }

    /// Progress across every course plus the overall average score.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` on repository failures.
    pub async fn learner_dashboard(&self) -> Result<LearnerDashboard, CourseServiceError> {
        let courses = self.courses.list_courses(COURSE_LIST_LIMIT).await?;
        let mut progress = Vec::with_capacity(courses.len());
        let mut scores = Vec::new();
        for course in &courses {
            let rows = self.results.list_course_results(course.id()).await?;
            scores.extend(rows.iter().map(|row| row.result.score()));
            progress.push(progress_for(course, &rows));
        }

        Ok(LearnerDashboard {
            completed_chapters: progress.iter().map(|p| p.completed).sum(),
            attempts: scores.len(),
            average_score: mean(&scores),
            courses: progress,
        })
    }

    async fn load_course(&self, course_id: CourseId) -> Result<Course, CourseServiceError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(CourseServiceError::CourseNotFound(course_id))
    }
}

//
// ─── HELPERS ───────────────────────────────────────────────────────────────────
//

struct ChapterStats {
    completed: HashSet<ChapterId>,
    attempts: HashMap<ChapterId, usize>,
    best: HashMap<ChapterId, f64>,
}

impl ChapterStats {
    fn from_rows(rows: &[ChapterResultRow]) -> Self {
        let mut stats = Self {
            completed: HashSet::new(),
            attempts: HashMap::new(),
            best: HashMap::new(),
        };
        for row in rows {
            let id = row.result.chapter_id();
            let score = row.result.score();
            stats.completed.insert(id);
            *stats.attempts.entry(id).or_default() += 1;
            stats
                .best
                .entry(id)
                .and_modify(|best| *best = best.max(score))
                .or_insert(score);
        }
        stats
    }

    fn is_completed(&self, id: ChapterId) -> bool {
        self.completed.contains(&id)
    }

    fn item(&self, entry: &OutlineEntry, status: ChapterStatus) -> OutlineItem {
        OutlineItem {
            chapter_id: entry.chapter_id,
            title: entry.title.clone(),
            duration_minutes: entry.duration_minutes,
            status,
            attempts: self.attempts.get(&entry.chapter_id).copied().unwrap_or(0),
            best_score: self.best.get(&entry.chapter_id).copied(),
        }
    }
}

/// Append `item` under its section and unit, opening a new group whenever the
/// outline moves on to a different one.
fn push_grouped(sections: &mut Vec<OutlineSection>, entry: &OutlineEntry, item: OutlineItem) {
    if sections.last().is_none_or(|s| s.title != entry.section) {
        sections.push(OutlineSection {
            title: entry.section.clone(),
            units: Vec::new(),
        });
    }
    let Some(section) = sections.last_mut() else {
        return;
    };
    if section.units.last().is_none_or(|u| u.title != entry.unit) {
        section.units.push(OutlineUnit {
            title: entry.unit.clone(),
            chapters: Vec::new(),
        });
    }
    if let Some(unit) = section.units.last_mut() {
        unit.chapters.push(item);
    }
}

fn progress_for(course: &Course, rows: &[ChapterResultRow]) -> CourseProgress {
    let stats = ChapterStats::from_rows(rows);
    let completed = course
        .outline()
        .iter()
        .filter(|e| stats.is_completed(e.chapter_id))
        .count();
    let scores: Vec<f64> = rows.iter().map(|row| row.result.score()).collect();

    CourseProgress {
        course_id: course.id(),
        title: course.title().to_owned(),
        completed,
        total: course.outline().len(),
        percent: course.progress_percent(|id| stats.is_completed(id)),
        next_chapter: course
            .next_chapter(|id| stats.is_completed(id))
            .map(|e| NextChapter {
                chapter_id: e.chapter_id,
                title: e.title.clone(),
            }),
        average_score: mean(&scores),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
