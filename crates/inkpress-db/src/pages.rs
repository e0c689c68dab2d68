//! Rendered chapter page repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use inkpress_core::{new_v7, Error, Page, PageRepository, Result};

/// PostgreSQL implementation of [`PageRepository`].
#[derive(Clone)]
pub struct PgPageRepository {
    pool: PgPool,
}

impl PgPageRepository {
    /// Create a new PgPageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_page_row(row: sqlx::postgres::PgRow) -> Page {
        Page {
            id: row.get("id"),
            chapter_id: row.get("chapter_id"),
            page_number: row.get("page_number"),
            image_path: row.get("image_path"),
            width: row.get("width"),
            height: row.get("height"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl PageRepository for PgPageRepository {
    async fn insert(
        &self,
        chapter_id: Uuid,
        page_number: i32,
        image_path: &str,
        width: i32,
        height: i32,
    ) -> Result<Uuid> {
        let id = new_v7();
        sqlx::query(
            "INSERT INTO chapter_pages \
                 (id, chapter_id, page_number, image_path, width, height, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(chapter_id)
        .bind(page_number)
        .bind(image_path)
        .bind(width)
        .bind(height)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }

    async fn max_page_number(&self, chapter_id: Uuid) -> Result<i32> {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(page_number) FROM chapter_pages WHERE chapter_id = $1",
        )
        .bind(chapter_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(max.unwrap_or(0))
    }

    async fn delete_for_chapter(&self, chapter_id: Uuid) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "DELETE FROM chapter_pages WHERE chapter_id = $1 RETURNING image_path",
        )
        .bind(chapter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|r| r.get("image_path")).collect())
    }

    async fn list_for_chapter(&self, chapter_id: Uuid) -> Result<Vec<Page>> {
        let rows = sqlx::query(
            "SELECT id, chapter_id, page_number, image_path, width, height, created_at \
             FROM chapter_pages \
             WHERE chapter_id = $1 \
             ORDER BY page_number ASC",
        )
        .bind(chapter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_page_row).collect())
    }
}
