use chrono::{DateTime, Utc};
use learn_core::model::{Course, CourseId, OutlineEntry};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    chapter_id_from_i64, conn, course_id_from_i64, id_i64, index_i64, ser, u32_from_i64,
};
use crate::repository::{CourseRepository, StorageError};

impl SqliteRepository {
    async fn load_outline(&self, course_id: CourseId) -> Result<Vec<OutlineEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT chapter_id, title, section, unit, duration_minutes
            FROM outline_entries
            WHERE course_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut outline = Vec::with_capacity(rows.len());
        for row in rows {
            outline.push(OutlineEntry::new(
                chapter_id_from_i64(row.try_get::<i64, _>("chapter_id").map_err(ser)?)?,
                row.try_get::<String, _>("title").map_err(ser)?,
                row.try_get::<String, _>("section").map_err(ser)?,
                row.try_get::<String, _>("unit").map_err(ser)?,
                u32_from_i64(
                    "duration_minutes",
                    row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
                )?,
            ));
        }
        Ok(outline)
    }

    async fn with_outline(&self, header: CourseHeader) -> Result<Course, StorageError> {
        let outline = self.load_outline(header.id).await?;
        Course::new(
            header.id,
            header.title,
            header.instructor,
            header.description,
            header.created_at,
            outline,
        )
        .map_err(ser)
    }
}

/// Course columns read before the outline is loaded, so no row is held across an await.
struct CourseHeader {
    id: CourseId,
    title: String,
    instructor: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl CourseHeader {
    fn from_row(row: &SqliteRow) -> Result<Self, StorageError> {
        Ok(Self {
            id: course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            title: row.try_get("title").map_err(ser)?,
            instructor: row.try_get("instructor").map_err(ser)?,
            description: row.try_get("description").map_err(ser)?,
            created_at: row.try_get("created_at").map_err(ser)?,
        })
    }
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let course_id = id_i64("course_id", course.id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO courses (id, title, instructor, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                instructor = excluded.instructor,
                description = excluded.description
            ",
        )
        .bind(course_id)
        .bind(course.title())
        .bind(course.instructor())
        .bind(course.description())
        .bind(course.created_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM outline_entries WHERE course_id = ?1")
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, entry) in course.outline().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO outline_entries (
                    course_id, position, chapter_id, title, section, unit, duration_minutes
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(course_id)
            .bind(index_i64("position", position)?)
            .bind(id_i64("chapter_id", entry.chapter_id.value())?)
            .bind(entry.title.as_str())
            .bind(entry.section.as_str())
            .bind(entry.unit.as_str())
            .bind(i64::from(entry.duration_minutes))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, instructor, description, created_at
            FROM courses WHERE id = ?1
            ",
        )
        .bind(id_i64("course_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let header = row.as_ref().map(CourseHeader::from_row).transpose()?;
        drop(row);
        match header {
            Some(header) => self.with_outline(header).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, instructor, description, created_at
            FROM courses
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let headers = rows
            .iter()
            .map(CourseHeader::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        drop(rows);

        let mut courses = Vec::with_capacity(headers.len());
        for header in headers {
            courses.push(self.with_outline(header).await?);
        }
        Ok(courses)
    }
}
