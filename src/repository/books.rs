//! Books repository

use sqlx::{Pool, Postgres, QueryBuilder, Row, Transaction};

use super::like_pattern;
use crate::{
    error::{AppError, AppResult},
    models::book::{search_terms, Book, BookFields, BookQuery},
};

const SELECT_BOOK: &str = r#"
    SELECT b.id, b.title, b.image, b.summary, b.isbn, b.bbk, b.copy_sign, b.pages,
           b.language_id, l.name AS language
    FROM books b
    JOIN languages l ON l.id = b.language_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List books ordered by title. Every search term must match the title
    /// or the first or last name of one of the book's authors.
    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_BOOK);
        builder.push(" WHERE 1=1");

        if let Some(title) = query.title_filter() {
            builder.push(" AND b.title = ").push_bind(title.to_string());
        }

        for term in search_terms(query.search.as_deref()) {
            let pattern = like_pattern(&term);
            builder
                .push(" AND (LOWER(b.title) LIKE ")
                .push_bind(pattern.clone())
                .push(
                    " OR EXISTS (SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id \
                     WHERE ba.book_id = b.id AND (LOWER(a.first_name) LIKE ",
                )
                .push_bind(pattern.clone())
                .push(" OR LOWER(a.last_name) LIKE ")
                .push_bind(pattern)
                .push(")))");
        }

        builder.push(" ORDER BY b.title, b.id");

        let rows = builder.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", SELECT_BOOK))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Books written by any of `author_ids`, as (author id, book) pairs
    pub async fn by_authors(&self, author_ids: &[i32]) -> AppResult<Vec<(i32, Book)>> {
        #[derive(sqlx::FromRow)]
        struct AuthorBookRow {
            author_id: i32,
            #[sqlx(flatten)]
            book: Book,
        }

        let rows = sqlx::query_as::<_, AuthorBookRow>(
            r#"
            SELECT ba.author_id, b.id, b.title, b.image, b.summary, b.isbn, b.bbk, b.copy_sign,
                   b.pages, b.language_id, l.name AS language
            FROM book_authors ba
            JOIN books b ON b.id = ba.book_id
            JOIN languages l ON l.id = b.language_id
            WHERE ba.author_id = ANY($1)
            ORDER BY b.title, b.id
            "#,
        )
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.author_id, r.book)).collect())
    }

    /// Author ids of one book
    pub async fn author_ids(&self, book_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT author_id FROM book_authors WHERE book_id = $1 ORDER BY author_id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Genre ids of one book
    pub async fn genre_ids(&self, book_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT genre_id FROM book_genres WHERE book_id = $1 ORDER BY genre_id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// All titles ordered by title
    pub async fn list_titles(&self) -> AppResult<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>("SELECT title FROM books ORDER BY title, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(titles)
    }

    /// Insert a book with its author and genre links
    pub async fn create(&self, fields: &BookFields) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO books (title, image, summary, isbn, bbk, copy_sign, pages, language_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.image)
        .bind(&fields.summary)
        .bind(&fields.isbn)
        .bind(&fields.bbk)
        .bind(&fields.copy_sign)
        .bind(pages_column(fields)?)
        .bind(fields.language_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::unique_violation(e, "isbn", "book with this isbn already exists."))?;
        let id: i32 = row.get("id");

        link_in_tx(&mut tx, id, fields).await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Replace a book's columns and links
    pub async fn update(&self, id: i32, fields: &BookFields) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $1, image = $2, summary = $3, isbn = $4, bbk = $5, copy_sign = $6,
                pages = $7, language_id = $8
            WHERE id = $9
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.image)
        .bind(&fields.summary)
        .bind(&fields.isbn)
        .bind(&fields.bbk)
        .bind(&fields.copy_sign)
        .bind(pages_column(fields)?)
        .bind(fields.language_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::unique_violation(e, "isbn", "book with this isbn already exists."))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }

        sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_in_tx(&mut tx, id, fields).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a book with its reviews and reader relations.
    /// Refused while the book still has copies.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        if !delete_books_in_tx(&mut tx, &[id]).await? {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Pages as stored in the SMALLINT column
fn pages_column(fields: &BookFields) -> AppResult<Option<i16>> {
    fields
        .pages
        .map(i16::try_from)
        .transpose()
        .map_err(|_| AppError::field("pages", "Ensure this value is between 1 and 32767."))
}

async fn link_in_tx(tx: &mut Transaction<'_, Postgres>, book_id: i32, fields: &BookFields) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO book_authors (book_id, author_id) SELECT $1, UNNEST($2::int[])",
    )
    .bind(book_id)
    .bind(&fields.author_ids)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "INSERT INTO book_genres (book_id, genre_id) SELECT $1, UNNEST($2::int[])",
    )
    .bind(book_id)
    .bind(&fields.genre_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Deletes `book_ids` and the rows depending on them inside `tx`.
/// Returns whether any book row was removed.
pub(crate) async fn delete_books_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    book_ids: &[i32],
) -> AppResult<bool> {
    if book_ids.is_empty() {
        return Ok(false);
    }

    let copies: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE book_id = ANY($1)")
        .bind(book_ids)
        .fetch_one(&mut **tx)
        .await?;
    if copies > 0 {
        return Err(AppError::Restricted(format!(
            "Cannot delete: {} book copies still reference this book",
            copies
        )));
    }

    for table in ["reviews", "user_book_relations", "book_authors", "book_genres"] {
        sqlx::query(&format!("DELETE FROM {} WHERE book_id = ANY($1)", table))
            .bind(book_ids)
            .execute(&mut **tx)
            .await?;
    }

    let result = sqlx::query("DELETE FROM books WHERE id = ANY($1)")
        .bind(book_ids)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_column() {
        let mut fields = BookFields {
            pages: Some(320),
            ..Default::default()
        };
        assert_eq!(pages_column(&fields).unwrap(), Some(320));
        fields.pages = None;
        assert_eq!(pages_column(&fields).unwrap(), None);
        fields.pages = Some(40_000);
        assert!(matches!(pages_column(&fields), Err(AppError::Fields(f)) if f.contains_key("pages")));
    }
}
