//! Reviews repository

use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::review::{Review, ReviewFields},
};

const SELECT_REVIEW: &str = r#"
    SELECT r.id, r.title, r.review_text, r.author_id, r.book_id, r.pub_date,
           u.username AS author_username, u.first_name AS author_first_name,
           u.last_name AS author_last_name
    FROM reviews r
    LEFT JOIN users u ON u.id = r.author_id
"#;

#[derive(Clone)]
pub struct ReviewsRepository {
    pool: Pool<Postgres>,
}

impl ReviewsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(&format!("{} ORDER BY r.pub_date, r.id", SELECT_REVIEW))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Review> {
        sqlx::query_as::<_, Review>(&format!("{} WHERE r.id = $1", SELECT_REVIEW))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))
    }

    /// Reviews of any of `book_ids`, oldest first
    pub async fn by_books(&self, book_ids: &[i32]) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            "{} WHERE r.book_id = ANY($1) ORDER BY r.pub_date, r.id",
            SELECT_REVIEW
        ))
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a review; the publication date is set by the database
    pub async fn create(&self, author_id: i32, fields: &ReviewFields) -> AppResult<i32> {
        let row = sqlx::query(
            r#"
            INSERT INTO reviews (title, review_text, author_id, book_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.review_text)
        .bind(author_id)
        .bind(fields.book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    pub async fn update(&self, id: i32, fields: &ReviewFields) -> AppResult<()> {
        let result = sqlx::query("UPDATE reviews SET title = $1, review_text = $2, book_id = $3 WHERE id = $4")
            .bind(&fields.title)
            .bind(&fields.review_text)
            .bind(fields.book_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Review {} not found", id)));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Review {} not found", id)));
        }
        Ok(())
    }
}
