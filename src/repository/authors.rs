//! Authors repository

use sqlx::{Pool, Postgres, QueryBuilder};

use super::like_pattern;
use crate::{
    error::{AppError, AppResult},
    models::author::{Author, AuthorFields},
};

const SELECT_AUTHOR: &str = r#"
    SELECT a.id, a.first_name, a.last_name, a.middle_name, a.date_of_birth, a.date_of_death, a.image
    FROM authors a
"#;

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List authors by last then first name. Every term must match the
    /// first or last name.
    pub async fn list(&self, terms: &[String]) -> AppResult<Vec<Author>> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_AUTHOR);
        builder.push(" WHERE 1=1");

        for term in terms {
            let pattern = like_pattern(term);
            builder
                .push(" AND (LOWER(a.first_name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(a.last_name) LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(" ORDER BY a.last_name, a.first_name, a.id");

        let rows = builder.build_query_as::<Author>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(&format!("{} WHERE a.id = $1", SELECT_AUTHOR))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
    }

    /// Authors of each of `book_ids`, as (book id, author) pairs
    pub async fn by_books(&self, book_ids: &[i32]) -> AppResult<Vec<(i32, Author)>> {
        #[derive(sqlx::FromRow)]
        struct BookAuthorRow {
            book_id: i32,
            #[sqlx(flatten)]
            author: Author,
        }

        let rows = sqlx::query_as::<_, BookAuthorRow>(
            r#"
            SELECT ba.book_id, a.id, a.first_name, a.last_name, a.middle_name,
                   a.date_of_birth, a.date_of_death, a.image
            FROM book_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY a.last_name, a.first_name, a.id
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.book_id, r.author)).collect())
    }

    /// Subset of `ids` that exist
    pub async fn existing_ids(&self, ids: &[i32]) -> AppResult<Vec<i32>> {
        let found = sqlx::query_scalar::<_, i32>("SELECT id FROM authors WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }

    pub async fn create(&self, fields: &AuthorFields) -> AppResult<Author> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (first_name, last_name, middle_name, date_of_birth, date_of_death, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, first_name, last_name, middle_name, date_of_birth, date_of_death, image
            "#,
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.middle_name)
        .bind(fields.date_of_birth)
        .bind(fields.date_of_death)
        .bind(&fields.image)
        .fetch_one(&self.pool)
        .await?;
        Ok(author)
    }

    pub async fn update(&self, id: i32, fields: &AuthorFields) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors
            SET first_name = $1, last_name = $2, middle_name = $3, date_of_birth = $4,
                date_of_death = $5, image = $6
            WHERE id = $7
            RETURNING id, first_name, last_name, middle_name, date_of_birth, date_of_death, image
            "#,
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.middle_name)
        .bind(fields.date_of_birth)
        .bind(fields.date_of_death)
        .bind(&fields.image)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
    }

    /// Delete an author; their books are kept without the link
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM book_authors WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
