use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            instructor TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS outline_entries (
            course_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            chapter_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            section TEXT NOT NULL,
            unit TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes >= 0),
            PRIMARY KEY (course_id, position),
            UNIQUE (course_id, chapter_id),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS chapters (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            chapter_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('mcq', 'fill-blank', 'text')),
            prompt TEXT NOT NULL,
            correct_answer TEXT NOT NULL,
            explanation TEXT,
            PRIMARY KEY (chapter_id, position),
            UNIQUE (chapter_id, id),
            FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS question_choices (
            chapter_id INTEGER NOT NULL,
            question_position INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            text TEXT NOT NULL,
            PRIMARY KEY (chapter_id, question_position, position),
            FOREIGN KEY (chapter_id, question_position)
                REFERENCES questions(chapter_id, position) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS chapter_results (
            id INTEGER PRIMARY KEY,
            chapter_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            total_questions INTEGER NOT NULL CHECK (total_questions > 0),
            correct_count INTEGER NOT NULL CHECK (correct_count >= 0),
            FOREIGN KEY (chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_chapters_course_position
            ON chapters (course_id, position);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_chapter_results_chapter_completed
            ON chapter_results (chapter_id, completed_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_chapter_results_course_completed
            ON chapter_results (course_id, completed_at);
    ",
];

/// Highest schema version this build knows how to use.
pub const LATEST_SCHEMA_VERSION: i64 = 1;

/// Highest applied migration, `None` on a fresh database.
pub async fn schema_version(pool: &SqlitePool) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await
}

/// Runs the pending migrations and returns the resulting schema version.
///
/// A database written by a newer build is rejected rather than modified.
pub async fn run_migrations(pool: &SqlitePool) -> Result<i64, SqliteInitError> {
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    let current = schema_version(pool).await?.unwrap_or(0);
    if current > LATEST_SCHEMA_VERSION {
        return Err(SqliteInitError::UnsupportedSchema {
            found: current,
            supported: LATEST_SCHEMA_VERSION,
        });
    }

    // Version 1: catalog, questions and chapter results.
    if current < 1 {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1.iter().copied() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(LATEST_SCHEMA_VERSION)
}
