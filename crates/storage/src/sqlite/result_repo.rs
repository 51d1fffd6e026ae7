use learn_core::model::{ChapterId, ChapterResult, CourseId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_result_row, map_result_row_with_id};
use crate::repository::{ChapterResultId, ChapterResultRepository, ChapterResultRow, StorageError};

#[async_trait::async_trait]
impl ChapterResultRepository for SqliteRepository {
    async fn append_result(&self, result: &ChapterResult) -> Result<ChapterResultId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO chapter_results (
                    chapter_id, course_id, started_at, completed_at,
                    total_questions, correct_count
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_i64("chapter_id", result.chapter_id().value())?)
        .bind(id_i64("course_id", result.course_id().value())?)
        .bind(result.started_at())
        .bind(result.completed_at())
        .bind(i64::from(result.total_questions()))
        .bind(i64::from(result.correct_count()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: ChapterResultId) -> Result<ChapterResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    chapter_id, course_id, started_at, completed_at,
                    total_questions, correct_count
                FROM chapter_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_results(
        &self,
        chapter_id: ChapterId,
        limit: u32,
    ) -> Result<Vec<ChapterResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, chapter_id, course_id, started_at, completed_at,
                    total_questions, correct_count
                FROM chapter_results
                WHERE chapter_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(id_i64("chapter_id", chapter_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row_with_id).collect()
    }

    async fn list_course_results(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ChapterResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, chapter_id, course_id, started_at, completed_at,
                    total_questions, correct_count
                FROM chapter_results
                WHERE course_id = ?1
                ORDER BY completed_at DESC, id DESC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row_with_id).collect()
    }
}
