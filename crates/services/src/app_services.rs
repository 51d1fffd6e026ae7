use std::sync::Arc;

use learn_core::model::{ChapterId, CourseId};
use storage::repository::Storage;
use storage::seed::seed_demo_catalog;

use crate::Clock;
use crate::course_service::CourseService;
use crate::error::AppServicesError;
use crate::quiz::QuizLoopService;

/// Assembles app-facing services and resolves a usable course id.
#[derive(Clone)]
pub struct AppServices {
    course_id: CourseId,
    seeded_demo: bool,
    storage: Storage,
    quiz_loop: Arc<QuizLoopService>,
    courses: Arc<CourseService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// An empty database receives the demo catalog.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or seeding fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        preferred_course_id: CourseId,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, preferred_course_id).await
    }

    /// Build services over in-memory storage seeded with the demo catalog.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if seeding fails.
    pub async fn in_memory(clock: Clock, course_id: CourseId) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, course_id).await
    }

    async fn from_storage(
        storage: Storage,
        clock: Clock,
        preferred_course_id: CourseId,
    ) -> Result<Self, AppServicesError> {
        let (course_id, seeded_demo) =
            ensure_default_course(&storage, clock, preferred_course_id).await?;

        let quiz_loop = Arc::new(QuizLoopService::new(
            clock,
            Arc::clone(&storage.chapters),
            Arc::clone(&storage.results),
        ));
        let courses = Arc::new(CourseService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.results),
        ));

        Ok(Self {
            course_id,
            seeded_demo,
            storage,
            quiz_loop,
            courses,
        })
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    /// True when this run wrote the demo catalog into an empty database.
    #[must_use]
    pub fn seeded_demo(&self) -> bool {
        self.seeded_demo
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn courses(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    /// Pick the chapter to quiz: `preferred` if given, otherwise the first chapter
    /// of the course that has questions.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::NoQuizChapter` if the course has none.
    pub async fn resolve_quiz_chapter(
        &self,
        preferred: Option<ChapterId>,
    ) -> Result<ChapterId, AppServicesError> {
        if let Some(id) = preferred {
            return Ok(id);
        }
        self.storage
            .chapters
            .list_chapters(self.course_id)
            .await?
            .iter()
            .find(|chapter| chapter.question_count() > 0)
            .map(|chapter| chapter.id())
            .ok_or(AppServicesError::NoQuizChapter(self.course_id))
    }
}

async fn ensure_default_course(
    storage: &Storage,
    clock: Clock,
    preferred_id: CourseId,
) -> Result<(CourseId, bool), AppServicesError> {
    if storage.courses.get_course(preferred_id).await?.is_some() {
        return Ok((preferred_id, false));
    }

    let existing = storage.courses.list_courses(128).await?;
    if let Some(first) = existing.first() {
        return Ok((first.id(), false));
    }

    seed_demo_catalog(storage, preferred_id, clock.now()).await?;
    tracing::info!(course_id = %preferred_id, "empty database, seeded demo catalog");
    Ok((preferred_id, true))
}
