use learn_core::model::{Chapter, ChapterId, CourseId, QuestionDraft, QuestionKind};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    chapter_id_from_i64, conn, course_id_from_i64, id_i64, index_i64, question_id_from_i64, ser,
    u32_from_i64,
};
use crate::repository::{ChapterRepository, StorageError};

/// Chapter columns, read before questions are loaded.
struct ChapterHeader {
    id: ChapterId,
    course_id: CourseId,
    title: String,
    content: String,
    position: u32,
}

impl ChapterHeader {
    fn from_row(row: &SqliteRow) -> Result<Self, StorageError> {
        Ok(Self {
            id: chapter_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            course_id: course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
            title: row.try_get("title").map_err(ser)?,
            content: row.try_get("content").map_err(ser)?,
            position: u32_from_i64("position", row.try_get::<i64, _>("position").map_err(ser)?)?,
        })
    }
}

fn draft_from_row(row: &SqliteRow) -> Result<QuestionDraft, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Ok(QuestionDraft {
        id: question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        kind: kind.parse::<QuestionKind>().map_err(ser)?,
        prompt: row.try_get("prompt").map_err(ser)?,
        choices: Vec::new(),
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
    })
}

impl SqliteRepository {
    async fn load_drafts(&self, chapter_id: i64) -> Result<Vec<QuestionDraft>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, kind, prompt, correct_answer, explanation
            FROM questions
            WHERE chapter_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(chapter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        let mut drafts = rows
            .iter()
            .map(draft_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        drop(rows);

        let choice_rows = sqlx::query(
            r"
            SELECT question_position, text
            FROM question_choices
            WHERE chapter_id = ?1
            ORDER BY question_position ASC, position ASC
            ",
        )
        .bind(chapter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        for row in &choice_rows {
            let position: i64 = row.try_get("question_position").map_err(ser)?;
            let draft = usize::try_from(position)
                .ok()
                .and_then(|p| drafts.get_mut(p))
                .ok_or_else(|| {
                    StorageError::Serialization(format!("orphan choice at question {position}"))
                })?;
            draft.choices.push(row.try_get("text").map_err(ser)?);
        }

        Ok(drafts)
    }

    async fn with_questions(&self, header: ChapterHeader) -> Result<Chapter, StorageError> {
        let drafts = self
            .load_drafts(id_i64("chapter_id", header.id.value())?)
            .await?;
        let questions = drafts
            .into_iter()
            .map(QuestionDraft::validate)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ser)?;

        Chapter::new(
            header.id,
            header.course_id,
            header.title,
            header.content,
            header.position,
            questions,
        )
        .map_err(ser)
    }
}

#[async_trait::async_trait]
impl ChapterRepository for SqliteRepository {
    async fn upsert_chapter(&self, chapter: &Chapter) -> Result<(), StorageError> {
        let chapter_id = id_i64("chapter_id", chapter.id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO chapters (id, course_id, title, content, position)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                content = excluded.content,
                position = excluded.position
            ",
        )
        .bind(chapter_id)
        .bind(id_i64("course_id", chapter.course_id().value())?)
        .bind(chapter.title())
        .bind(chapter.content())
        .bind(i64::from(chapter.position()))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        // Choices go with their questions via ON DELETE CASCADE.
        sqlx::query("DELETE FROM questions WHERE chapter_id = ?1")
            .bind(chapter_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in chapter.questions().iter().enumerate() {
            let position = index_i64("position", position)?;
            sqlx::query(
                r"
                INSERT INTO questions (
                    chapter_id, position, id, kind, prompt, correct_answer, explanation
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(chapter_id)
            .bind(position)
            .bind(id_i64("question_id", question.id().value())?)
            .bind(question.kind().as_str())
            .bind(question.prompt())
            .bind(question.correct_answer())
            .bind(question.explanation())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for (choice_position, text) in question.choices().iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO question_choices (chapter_id, question_position, position, text)
                    VALUES (?1, ?2, ?3, ?4)
                    ",
                )
                .bind(chapter_id)
                .bind(position)
                .bind(index_i64("choice position", choice_position)?)
                .bind(text.as_str())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Option<Chapter>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, title, content, position
            FROM chapters WHERE id = ?1
            ",
        )
        .bind(id_i64("chapter_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let header = row.as_ref().map(ChapterHeader::from_row).transpose()?;
        drop(row);
        match header {
            Some(header) => self.with_questions(header).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_chapters(&self, course_id: CourseId) -> Result<Vec<Chapter>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, content, position
            FROM chapters
            WHERE course_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let headers = rows
            .iter()
            .map(ChapterHeader::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        drop(rows);

        let mut chapters = Vec::with_capacity(headers.len());
        for header in headers {
            chapters.push(self.with_questions(header).await?);
        }
        Ok(chapters)
    }
}
