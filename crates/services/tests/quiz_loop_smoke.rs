use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use learn_core::QuizError;
use learn_core::model::{ChapterId, ChapterResult, ChapterStatus, CourseId};
use learn_core::time::fixed_now;
use services::{Clock, CourseService, QuizLoopService, QuizServiceError};
use storage::repository::{
    ChapterResultId, ChapterResultRepository, ChapterResultRow, InMemoryRepository, Storage,
    StorageError,
};
use storage::seed::seed_demo_catalog;

async fn demo_storage() -> (Storage, ChapterId) {
    let storage = Storage::in_memory();
    let chapter_id = seed_demo_catalog(&storage, CourseId::new(1), fixed_now())
        .await
        .unwrap();
    (storage, chapter_id)
}

#[tokio::test]
async fn quiz_loop_persists_result_and_unlocks_next_chapter() {
    let (storage, chapter_id) = demo_storage().await;
    let quiz_loop = QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::clone(&storage.chapters),
        Arc::clone(&storage.results),
    );

    let mut quiz = quiz_loop.start_quiz(chapter_id).await.unwrap();
    assert_eq!(quiz.title(), "Handling Events");

    quiz_loop
        .record_answer(&mut quiz, "onClick={handleClick}")
        .unwrap();
    quiz_loop.advance(&mut quiz).unwrap();
    quiz_loop.record_answer(&mut quiz, "onClick").unwrap();
    quiz_loop.advance(&mut quiz).unwrap();
    quiz_loop
        .record_answer(&mut quiz, "I don't know")
        .unwrap();

    let outcome = quiz_loop.submit(&mut quiz).await.unwrap();
    assert_eq!(outcome.score.correct(), 2);
    assert_eq!(format!("{:.2}", outcome.score.percent()), "66.67");

    let stored = storage.results.get_result(outcome.result_id).await.unwrap();
    assert_eq!(stored.correct_count(), 2);
    assert_eq!(stored.total_questions(), 3);
    assert_eq!(stored.rounded_percent(), 67);

    let review = quiz.review().unwrap();
    let correct: Vec<_> = review.iter().map(|o| o.correct).collect();
    assert_eq!(correct, [true, true, false]);

    let courses = CourseService::new(Arc::clone(&storage.courses), Arc::clone(&storage.results));
    let outline = courses.course_outline(CourseId::new(1)).await.unwrap();
    let item = outline
        .items()
        .find(|i| i.chapter_id == chapter_id)
        .unwrap();
    assert_eq!(item.status, ChapterStatus::Completed);
    // Earlier chapters have no attempts, so the first one is still current.
    assert_eq!(outline.items().next().unwrap().status, ChapterStatus::Current);

    let progress = courses.course_progress(CourseId::new(1)).await.unwrap();
    assert_eq!(progress.completed, 1);
    assert_eq!(progress.total, 9);
}

#[tokio::test]
async fn navigation_rejections_leave_quiz_untouched() {
    let (storage, chapter_id) = demo_storage().await;
    let quiz_loop = QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::clone(&storage.chapters),
        Arc::clone(&storage.results),
    );
    let mut quiz = quiz_loop.start_quiz(chapter_id).await.unwrap();

    let err = quiz_loop.retreat(&mut quiz).unwrap_err();
    assert!(matches!(err, QuizServiceError::Quiz(QuizError::AtFirstQuestion)));
    assert!(err.is_rejection());

    let err = quiz_loop.advance(&mut quiz).unwrap_err();
    assert!(matches!(err, QuizServiceError::Quiz(QuizError::Unanswered { index: 0 })));

    quiz_loop.record_answer(&mut quiz, "").unwrap();
    assert!(quiz_loop.advance(&mut quiz).is_err());
    assert_eq!(quiz.session().cursor(), 0);

    quiz_loop.choose(&mut quiz, 2).unwrap();
    quiz_loop.advance(&mut quiz).unwrap();
    quiz_loop.record_answer(&mut quiz, "onClick").unwrap();

    let err = quiz_loop.submit(&mut quiz).await.unwrap_err();
    assert!(matches!(
        err,
        QuizServiceError::Quiz(QuizError::NotOnFinalQuestion { cursor: 1, last: 2 })
    ));
    assert!(!quiz.is_finalized());
    assert!(
        storage
            .results
            .list_results(chapter_id, 10)
            .await
            .unwrap()
            .is_empty()
    );
}

/// Result store whose first append fails.
struct FlakyResults {
    inner: InMemoryRepository,
    failed_once: AtomicBool,
}

#[async_trait]
impl ChapterResultRepository for FlakyResults {
    async fn append_result(&self, result: &ChapterResult) -> Result<ChapterResultId, StorageError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(StorageError::Connection("database is locked".into()));
        }
        self.inner.append_result(result).await
    }

    async fn get_result(&self, id: ChapterResultId) -> Result<ChapterResult, StorageError> {
        self.inner.get_result(id).await
    }

    async fn list_results(
        &self,
        chapter_id: ChapterId,
        limit: u32,
    ) -> Result<Vec<ChapterResultRow>, StorageError> {
        self.inner.list_results(chapter_id, limit).await
    }

    async fn list_course_results(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ChapterResultRow>, StorageError> {
        self.inner.list_course_results(course_id).await
    }
}

#[tokio::test]
async fn failed_append_can_be_retried() {
    let (storage, chapter_id) = demo_storage().await;
    let results = Arc::new(FlakyResults {
        inner: InMemoryRepository::new(),
        failed_once: AtomicBool::new(false),
    });
    let quiz_loop = QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::clone(&storage.chapters),
        results.clone(),
    );

    let mut quiz = quiz_loop.start_quiz(chapter_id).await.unwrap();
    quiz_loop.choose(&mut quiz, 2).unwrap();
    quiz_loop.advance(&mut quiz).unwrap();
    quiz_loop.record_answer(&mut quiz, "onClick").unwrap();
    quiz_loop.advance(&mut quiz).unwrap();
    quiz_loop.record_answer(&mut quiz, "no idea").unwrap();

    let err = quiz_loop.submit(&mut quiz).await.unwrap_err();
    assert!(matches!(err, QuizServiceError::Storage(_)));
    assert!(quiz.is_finalized());
    assert_eq!(quiz.result_id(), None);

    let id = quiz_loop.finalize_result(&mut quiz).await.unwrap();
    assert_eq!(quiz.result_id(), Some(id));
    assert_eq!(results.inner.list_results(chapter_id, 10).await.unwrap().len(), 1);
}
