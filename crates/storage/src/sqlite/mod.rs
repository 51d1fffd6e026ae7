//! `SQLite` adapter for the course catalog and chapter results.
//!
//! Writes are one transaction per upsert or a single-row append, and a quiz has
//! one writer, so the pool stays small and relies on `busy_timeout` for the rare
//! overlap between the app and the `seed` binary.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use thiserror::Error;

use crate::repository::{ChapterRepository, ChapterResultRepository, CourseRepository, Storage};

mod chapter_repo;
mod course_repo;
mod mapping;
mod migrate;
mod result_repo;

pub use migrate::LATEST_SCHEMA_VERSION;

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Courses, chapters and results stored in one `SQLite` database.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open a pool on `database_url` with foreign keys enforced.
    ///
    /// One connection is kept open so shared-cache in-memory databases survive
    /// between queries.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::Sqlx` if the URL is invalid or the database cannot be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(1)
            .acquire_timeout(BUSY_TIMEOUT)
            .connect_with(options)
            .await?;
        tracing::debug!(url = database_url, max_connections = MAX_CONNECTIONS, "opened sqlite pool");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending migrations and return the schema version in use.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::UnsupportedSchema` for a database from a newer build,
    /// or `SqliteInitError::Sqlx` if a migration fails.
    pub async fn migrate(&self) -> Result<i64, SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }

    /// Highest applied migration, `None` before [`SqliteRepository::migrate`] has run.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::Sqlx` if the migrations table cannot be read.
    pub async fn schema_version(&self) -> Result<Option<i64>, SqliteInitError> {
        Ok(migrate::schema_version(&self.pool).await?)
    }
}

impl Storage {
    /// Open, migrate and wrap a `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        let version = repo.migrate().await?;
        tracing::info!(url = database_url, schema_version = version, "sqlite storage ready");

        let repo = Arc::new(repo);
        Ok(Self {
            courses: Arc::clone(&repo) as Arc<dyn CourseRepository>,
            chapters: Arc::clone(&repo) as Arc<dyn ChapterRepository>,
            results: repo as Arc<dyn ChapterResultRepository>,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use learn_core::model::{ChapterResult, CourseId};
    use learn_core::time::fixed_now;

    use crate::seed::{demo_course, handling_events_chapter};

    async fn open(name: &str) -> SqliteRepository {
        SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn migrate_reports_version_and_is_repeatable() {
        let repo = open("memdb_mod_migrate").await;
        assert_eq!(repo.migrate().await.unwrap(), LATEST_SCHEMA_VERSION);
        assert_eq!(repo.migrate().await.unwrap(), LATEST_SCHEMA_VERSION);
        assert_eq!(repo.schema_version().await.unwrap(), Some(LATEST_SCHEMA_VERSION));
    }

    #[tokio::test]
    async fn newer_schema_is_rejected() {
        let repo = open("memdb_mod_newer").await;
        repo.migrate().await.unwrap();
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(LATEST_SCHEMA_VERSION + 1)
            .bind(fixed_now())
            .execute(repo.pool())
            .await
            .unwrap();

        let err = repo.migrate().await.unwrap_err();
        assert!(matches!(
            err,
            SqliteInitError::UnsupportedSchema { found, supported }
                if found == LATEST_SCHEMA_VERSION + 1 && supported == LATEST_SCHEMA_VERSION
        ));
    }

    #[tokio::test]
    async fn deleting_a_chapter_removes_its_questions_and_results() {
        let repo = open("memdb_mod_cascade").await;
        repo.migrate().await.unwrap();
        let course_id = CourseId::new(1);
        repo.upsert_course(&demo_course(course_id, fixed_now()).unwrap())
            .await
            .unwrap();
        let chapter = handling_events_chapter(course_id).unwrap();
        repo.upsert_chapter(&chapter).await.unwrap();
        let result = ChapterResult::from_persisted(
            chapter.id(),
            course_id,
            fixed_now(),
            fixed_now() + ChronoDuration::minutes(2),
            3,
            2,
        )
        .unwrap();
        repo.append_result(&result).await.unwrap();

        sqlx::query("DELETE FROM chapters WHERE id = ?1")
            .bind(i64::try_from(chapter.id().value()).unwrap())
            .execute(repo.pool())
            .await
            .unwrap();

        assert!(repo.list_results(chapter.id(), 10).await.unwrap().is_empty());
        let orphans: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM questions) + (SELECT COUNT(*) FROM question_choices)",
        )
        .fetch_one(repo.pool())
        .await
        .unwrap();
        assert_eq!(orphans, 0);
    }
}
