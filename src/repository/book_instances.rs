//! Book instances (physical copies) repository

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book_instance::{BookInstance, BookInstanceFields, LoanStatus},
};

const SELECT_COPY: &str = r#"
    SELECT bi.id, bi.inventory, bi.book_id, bi.imprint, bi.due_back, bi.status, bi.borrower_id,
           u.username AS borrower_username, u.first_name AS borrower_first_name,
           u.last_name AS borrower_last_name
    FROM book_instances bi
    LEFT JOIN users u ON u.id = bi.borrower_id
"#;

#[derive(Clone)]
pub struct BookInstancesRepository {
    pool: Pool<Postgres>,
}

impl BookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All copies, earliest due date first
    pub async fn list(&self) -> AppResult<Vec<BookInstance>> {
        let rows = sqlx::query_as::<_, BookInstance>(&format!(
            "{} ORDER BY bi.due_back, bi.id",
            SELECT_COPY
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(&format!("{} WHERE bi.id = $1", SELECT_COPY))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book copy {} not found", id)))
    }

    /// Copies of any of `book_ids`
    pub async fn by_books(&self, book_ids: &[i32]) -> AppResult<Vec<BookInstance>> {
        let rows = sqlx::query_as::<_, BookInstance>(&format!(
            "{} WHERE bi.book_id = ANY($1) ORDER BY bi.due_back, bi.id",
            SELECT_COPY
        ))
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Copies on loan, optionally restricted to one borrower, earliest due first
    pub async fn on_loan(&self, borrower_id: Option<i32>) -> AppResult<Vec<BookInstance>> {
        let rows = sqlx::query_as::<_, BookInstance>(&format!(
            "{} WHERE bi.status = $1 AND ($2::int IS NULL OR bi.borrower_id = $2) \
             ORDER BY bi.due_back, bi.id",
            SELECT_COPY
        ))
        .bind(LoanStatus::OnLoan)
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn inventory_exists(&self, inventory: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM book_instances WHERE inventory = $1 AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(inventory)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, fields: &BookInstanceFields) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO book_instances (id, inventory, book_id, imprint, due_back, status, borrower_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&fields.inventory)
        .bind(fields.book_id)
        .bind(&fields.imprint)
        .bind(fields.due_back)
        .bind(fields.status)
        .bind(fields.borrower_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::unique_violation(e, "inventory", "book instance with this inventory already exists."))?;
        Ok(id)
    }

    pub async fn update(&self, id: Uuid, fields: &BookInstanceFields) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE book_instances
            SET inventory = $1, book_id = $2, imprint = $3, due_back = $4, status = $5, borrower_id = $6
            WHERE id = $7
            "#,
        )
        .bind(&fields.inventory)
        .bind(fields.book_id)
        .bind(&fields.imprint)
        .bind(fields.due_back)
        .bind(fields.status)
        .bind(fields.borrower_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::unique_violation(e, "inventory", "book instance with this inventory already exists."))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book copy {} not found", id)));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book copy {} not found", id)));
        }
        Ok(())
    }
}
