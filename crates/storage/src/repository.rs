use async_trait::async_trait;
use learn_core::model::{Chapter, ChapterId, ChapterResult, Course, CourseId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for a persisted chapter result (`SQLite` row id).
pub type ChapterResultId = i64;

/// A chapter result together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterResultRow {
    pub id: ChapterResultId,
    pub result: ChapterResult,
}

impl ChapterResultRow {
    #[must_use]
    pub fn new(id: ChapterResultId, result: ChapterResult) -> Self {
        Self { id, result }
    }
}

/// Repository contract for the course catalog.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or replace a course and its outline.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// List courses ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError>;
}

/// Repository contract for chapter content and questions.
#[async_trait]
pub trait ChapterRepository: Send + Sync {
    /// Persist or replace a chapter, including its full question list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the chapter cannot be stored.
    async fn upsert_chapter(&self, chapter: &Chapter) -> Result<(), StorageError>;

    /// Fetch a chapter by ID. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_chapter(&self, id: ChapterId) -> Result<Option<Chapter>, StorageError>;

    /// All chapters of a course, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_chapters(&self, course_id: CourseId) -> Result<Vec<Chapter>, StorageError>;
}

/// Append-only log of finalized chapter quizzes.
#[async_trait]
pub trait ChapterResultRepository: Send + Sync {
    /// Append a result and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &ChapterResult) -> Result<ChapterResultId, StorageError>;

    /// Fetch a result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ChapterResultId) -> Result<ChapterResult, StorageError>;

    /// Results for one chapter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_results(
        &self,
        chapter_id: ChapterId,
        limit: u32,
    ) -> Result<Vec<ChapterResultRow>, StorageError>;

    /// Every result recorded for chapters of a course, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_course_results(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ChapterResultRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    chapters: Arc<Mutex<HashMap<ChapterId, Chapter>>>,
    results: Arc<Mutex<Vec<ChapterResultRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn newest_first(rows: &mut [ChapterResultRow]) {
    rows.sort_by(|a, b| {
        b.result
            .completed_at()
            .cmp(&a.result.completed_at())
            .then(b.id.cmp(&a.id))
    });
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        let mut courses: Vec<Course> = guard.values().cloned().collect();
        courses.sort_by_key(Course::id);
        courses.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(courses)
    }
}

#[async_trait]
impl ChapterRepository for InMemoryRepository {
    async fn upsert_chapter(&self, chapter: &Chapter) -> Result<(), StorageError> {
        let mut guard = self.chapters.lock().map_err(poisoned)?;
        guard.insert(chapter.id(), chapter.clone());
        Ok(())
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Option<Chapter>, StorageError> {
        let guard = self.chapters.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_chapters(&self, course_id: CourseId) -> Result<Vec<Chapter>, StorageError> {
        let guard = self.chapters.lock().map_err(poisoned)?;
        let mut chapters: Vec<Chapter> = guard
            .values()
            .filter(|c| c.course_id() == course_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| (c.position(), c.id()));
        Ok(chapters)
    }
}

#[async_trait]
impl ChapterResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &ChapterResult) -> Result<ChapterResultId, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let id = ChapterResultId::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        guard.push(ChapterResultRow::new(id, result.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: ChapterResultId) -> Result<ChapterResult, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.result.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        chapter_id: ChapterId,
        limit: u32,
    ) -> Result<Vec<ChapterResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows: Vec<ChapterResultRow> = guard
            .iter()
            .filter(|row| row.result.chapter_id() == chapter_id)
            .cloned()
            .collect();
        newest_first(&mut rows);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn list_course_results(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ChapterResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows: Vec<ChapterResultRow> = guard
            .iter()
            .filter(|row| row.result.course_id() == course_id)
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub chapters: Arc<dyn ChapterRepository>,
    pub results: Arc<dyn ChapterResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let chapters: Arc<dyn ChapterRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ChapterResultRepository> = Arc::new(repo);
        Self {
            courses,
            chapters,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use learn_core::model::QuestionDraft;
    use learn_core::time::fixed_now;

    fn chapter(id: u64, course: u64, position: u32) -> Chapter {
        let q = QuestionDraft::fill_in_blank(1, "Complete", "onClick")
            .validate()
            .unwrap();
        Chapter::new(
            ChapterId::new(id),
            CourseId::new(course),
            format!("Chapter {id}"),
            "",
            position,
            vec![q],
        )
        .unwrap()
    }

    fn result(chapter: u64, minutes: i64, correct: u32) -> ChapterResult {
        let started = fixed_now() + Duration::minutes(minutes);
        ChapterResult::from_persisted(
            ChapterId::new(chapter),
            CourseId::new(1),
            started,
            started + Duration::minutes(2),
            3,
            correct,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn chapters_list_in_position_order() {
        let repo = InMemoryRepository::new();
        repo.upsert_chapter(&chapter(10, 1, 2)).await.unwrap();
        repo.upsert_chapter(&chapter(11, 1, 0)).await.unwrap();
        repo.upsert_chapter(&chapter(12, 2, 1)).await.unwrap();

        let listed = repo.list_chapters(CourseId::new(1)).await.unwrap();
        let ids: Vec<u64> = listed.iter().map(|c| c.id().value()).collect();
        assert_eq!(ids, vec![11, 10]);
        assert!(repo.get_chapter(ChapterId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn results_are_listed_newest_first() {
        let repo = InMemoryRepository::new();
        let first = repo.append_result(&result(1, 0, 1)).await.unwrap();
        let second = repo.append_result(&result(1, 10, 3)).await.unwrap();
        repo.append_result(&result(2, 5, 2)).await.unwrap();

        let rows = repo.list_results(ChapterId::new(1), 10).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(repo.list_course_results(CourseId::new(1)).await.unwrap().len(), 3);
        assert_eq!(repo.get_result(first).await.unwrap().correct_count(), 1);
        assert!(matches!(
            repo.get_result(42).await.unwrap_err(),
            StorageError::NotFound
        ));
    }
}
