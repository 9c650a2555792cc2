//! Book copies and loans service

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book_instance::{BookInstanceFields, BookInstanceInput, BookInstanceView},
    repository::Repository,
    services::catalog::invalid_pk,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_copies(&self) -> AppResult<Vec<BookInstanceView>> {
        let copies = self.repository.book_instances.list().await?;
        Ok(copies.into_iter().map(Into::into).collect())
    }

    pub async fn get_copy(&self, id: Uuid) -> AppResult<BookInstanceView> {
        Ok(self.repository.book_instances.get_by_id(id).await?.into())
    }

    pub async fn create_copy(&self, input: BookInstanceInput) -> AppResult<BookInstanceView> {
        input.require_full()?;

        let mut fields = BookInstanceFields::default();
        fields.apply(input);
        self.check_copy(&fields, None).await?;

        let id = self.repository.book_instances.create(&fields).await?;
        tracing::info!(copy_id = %id, book_id = fields.book_id, "Book copy created");
        self.get_copy(id).await
    }

    pub async fn update_copy(
        &self,
        id: Uuid,
        input: BookInstanceInput,
        partial: bool,
    ) -> AppResult<BookInstanceView> {
        if !partial {
            input.require_full()?;
        }

        let copy = self.repository.book_instances.get_by_id(id).await?;
        let mut fields = copy.fields();
        fields.apply(input);
        self.check_copy(&fields, Some(id)).await?;

        self.repository.book_instances.update(id, &fields).await?;
        if copy.status != fields.status {
            tracing::info!(copy_id = %id, from = %copy.status, to = %fields.status, "Copy status changed");
        }
        self.get_copy(id).await
    }

    pub async fn delete_copy(&self, id: Uuid) -> AppResult<()> {
        self.repository.book_instances.delete(id).await
    }

    /// Copies the user currently has on loan, earliest due first
    pub async fn borrowed_by(&self, user_id: i32) -> AppResult<Vec<BookInstanceView>> {
        let copies = self.repository.book_instances.on_loan(Some(user_id)).await?;
        Ok(copies.into_iter().map(Into::into).collect())
    }

    /// Every copy on loan, earliest due first
    pub async fn all_borrowed(&self) -> AppResult<Vec<BookInstanceView>> {
        let copies = self.repository.book_instances.on_loan(None).await?;
        Ok(copies.into_iter().map(Into::into).collect())
    }

    async fn check_copy(&self, fields: &BookInstanceFields, exclude_id: Option<Uuid>) -> AppResult<()> {
        fields.validate()?;

        if !self.repository.books.exists(fields.book_id).await? {
            return Err(invalid_pk("book", fields.book_id));
        }
        if let Some(borrower_id) = fields.borrower_id {
            if !self.repository.users.exists(borrower_id).await? {
                return Err(invalid_pk("borrower", borrower_id));
            }
        }
        if let Some(ref inventory) = fields.inventory {
            if self
                .repository
                .book_instances
                .inventory_exists(inventory, exclude_id)
                .await?
            {
                return Err(AppError::field(
                    "inventory",
                    "book instance with this inventory already exists.",
                ));
            }
        }
        Ok(())
    }
}
