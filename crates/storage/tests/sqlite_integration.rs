use chrono::Duration;
use learn_core::model::{
    Chapter, ChapterId, ChapterResult, Course, CourseId, OutlineEntry, QuestionDraft, QuestionKind,
};
use learn_core::time::fixed_now;
use storage::repository::{
    ChapterRepository, ChapterResultRepository, CourseRepository, Storage, StorageError,
};
use storage::seed::{handling_events_chapter_id, seed_demo_catalog};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_course(id: u64, chapters: &[u64]) -> Course {
    let outline = chapters
        .iter()
        .map(|c| OutlineEntry::new(ChapterId::new(*c), format!("Chapter {c}"), "Basics", "Intro", 15))
        .collect();
    Course::new(
        CourseId::new(id),
        "Course",
        "Instructor",
        Some("About".into()),
        fixed_now(),
        outline,
    )
    .unwrap()
}

fn build_chapter(id: u64, course_id: u64, position: u32) -> Chapter {
    let questions = vec![
        QuestionDraft::multiple_choice(1, "Pick one", ["alpha", "beta", "gamma"], "beta")
            .with_explanation("beta is second")
            .validate()
            .unwrap(),
        QuestionDraft::fill_in_blank(2, "Fill ___", "blank").validate().unwrap(),
        QuestionDraft::free_text(3, "Explain", "because").validate().unwrap(),
    ];
    Chapter::new(
        ChapterId::new(id),
        CourseId::new(course_id),
        format!("Chapter {id}"),
        "First paragraph.\n\nSecond paragraph.",
        position,
        questions,
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_course_outline() {
    let repo = connect("memdb_course_outline").await;
    let course = build_course(1, &[10, 11, 12]);
    repo.upsert_course(&course).await.unwrap();

    let fetched = repo.get_course(course.id()).await.unwrap().expect("course");
    assert_eq!(fetched, course);

    // Re-upserting with a shorter outline replaces the entries.
    let trimmed = build_course(1, &[10, 12]);
    repo.upsert_course(&trimmed).await.unwrap();
    let fetched = repo.get_course(course.id()).await.unwrap().expect("course");
    assert_eq!(fetched.outline().len(), 2);
    assert_eq!(fetched.outline()[1].chapter_id, ChapterId::new(12));

    assert!(repo.get_course(CourseId::new(99)).await.unwrap().is_none());
    assert_eq!(repo.list_courses(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_roundtrip_persists_questions_in_order() {
    let repo = connect("memdb_chapter_questions").await;
    repo.upsert_course(&build_course(1, &[10, 11])).await.unwrap();

    let second = build_chapter(11, 1, 1);
    let first = build_chapter(10, 1, 0);
    repo.upsert_chapter(&second).await.unwrap();
    repo.upsert_chapter(&first).await.unwrap();

    let fetched = repo.get_chapter(first.id()).await.unwrap().expect("chapter");
    assert_eq!(fetched, first);
    let mcq = &fetched.questions()[0];
    assert_eq!(mcq.kind(), QuestionKind::MultipleChoice);
    assert_eq!(mcq.choices(), ["alpha", "beta", "gamma"]);
    assert_eq!(mcq.explanation(), Some("beta is second"));
    assert!(fetched.questions()[1].choices().is_empty());

    let listed = repo.list_chapters(CourseId::new(1)).await.unwrap();
    let ids: Vec<_> = listed.iter().map(Chapter::id).collect();
    assert_eq!(ids, vec![ChapterId::new(10), ChapterId::new(11)]);
}

#[tokio::test]
async fn sqlite_upsert_chapter_replaces_question_list() {
    let repo = connect("memdb_chapter_replace").await;
    repo.upsert_course(&build_course(1, &[10])).await.unwrap();
    repo.upsert_chapter(&build_chapter(10, 1, 0)).await.unwrap();

    let replacement = Chapter::new(
        ChapterId::new(10),
        CourseId::new(1),
        "Renamed",
        "",
        0,
        vec![QuestionDraft::free_text(7, "Only one", "answer").validate().unwrap()],
    )
    .unwrap();
    repo.upsert_chapter(&replacement).await.unwrap();

    let fetched = repo.get_chapter(ChapterId::new(10)).await.unwrap().expect("chapter");
    assert_eq!(fetched.title(), "Renamed");
    assert_eq!(fetched.question_count(), 1);
}

#[tokio::test]
async fn sqlite_chapter_requires_existing_course() {
    let repo = connect("memdb_chapter_fk").await;
    let err = repo.upsert_chapter(&build_chapter(10, 42, 0)).await.unwrap_err();
    assert!(matches!(err, StorageError::Connection(_)));
}

#[tokio::test]
async fn sqlite_results_are_listed_newest_first() {
    let repo = connect("memdb_results").await;
    repo.upsert_course(&build_course(1, &[10, 11])).await.unwrap();
    repo.upsert_chapter(&build_chapter(10, 1, 0)).await.unwrap();
    repo.upsert_chapter(&build_chapter(11, 1, 1)).await.unwrap();

    let start = fixed_now();
    let older = ChapterResult::from_persisted(
        ChapterId::new(10),
        CourseId::new(1),
        start,
        start + Duration::minutes(4),
        3,
        1,
    )
    .unwrap();
    let newer = ChapterResult::from_persisted(
        ChapterId::new(10),
        CourseId::new(1),
        start + Duration::hours(1),
        start + Duration::hours(1) + Duration::minutes(3),
        3,
        2,
    )
    .unwrap();
    let other = ChapterResult::from_persisted(
        ChapterId::new(11),
        CourseId::new(1),
        start,
        start + Duration::minutes(2),
        3,
        3,
    )
    .unwrap();

    let older_id = repo.append_result(&older).await.unwrap();
    let newer_id = repo.append_result(&newer).await.unwrap();
    repo.append_result(&other).await.unwrap();

    assert_eq!(repo.get_result(older_id).await.unwrap(), older);

    let rows = repo.list_results(ChapterId::new(10), 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, newer_id);
    assert_eq!(rows[0].result, newer);
    assert_eq!(rows[1].id, older_id);

    let limited = repo.list_results(ChapterId::new(10), 1).await.unwrap();
    assert_eq!(limited.len(), 1);

    let course_rows = repo.list_course_results(CourseId::new(1)).await.unwrap();
    assert_eq!(course_rows.len(), 3);

    let missing = repo.get_result(newer_id + 100).await.unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_storage_accepts_demo_catalog() {
    let storage = Storage::sqlite("sqlite:file:memdb_demo_seed?mode=memory&cache=shared")
        .await
        .expect("storage");
    let course_id = CourseId::new(1);

    let chapter_id = seed_demo_catalog(&storage, course_id, fixed_now()).await.unwrap();
    seed_demo_catalog(&storage, course_id, fixed_now()).await.unwrap();

    assert_eq!(chapter_id, handling_events_chapter_id(course_id));
    let course = storage.courses.get_course(course_id).await.unwrap().expect("course");
    assert_eq!(course.title(), "React Fundamentals");
    assert_eq!(course.outline().len(), 9);

    let chapter = storage.chapters.get_chapter(chapter_id).await.unwrap().expect("chapter");
    assert_eq!(chapter.title(), "Handling Events");
    assert_eq!(chapter.question_count(), 3);
    assert!(chapter.questions()[0].accepts("onClick={handleClick}"));
}
