//! User ↔ book relations repository

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::book_relation::{BookRelationFields, UserBookRelation},
};

#[derive(Clone)]
pub struct BookRelationsRepository {
    pool: Pool<Postgres>,
}

impl BookRelationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: i32, book_id: i32) -> AppResult<Option<UserBookRelation>> {
        let row = sqlx::query_as::<_, UserBookRelation>(
            "SELECT * FROM user_book_relations WHERE user_id = $1 AND book_id = $2",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Create the relation or overwrite the existing one for (user, book)
    pub async fn upsert(
        &self,
        user_id: i32,
        book_id: i32,
        fields: &BookRelationFields,
    ) -> AppResult<UserBookRelation> {
        let row = sqlx::query_as::<_, UserBookRelation>(
            r#"
            INSERT INTO user_book_relations (user_id, book_id, liked, in_bookmarks, rate)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, book_id)
            DO UPDATE SET liked = EXCLUDED.liked, in_bookmarks = EXCLUDED.in_bookmarks, rate = EXCLUDED.rate
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(fields.like)
        .bind(fields.in_bookmarks)
        .bind(i16::from(fields.rate))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
