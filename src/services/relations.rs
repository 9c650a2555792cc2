//! Reader ↔ book relations service

use crate::{
    error::{AppError, AppResult},
    models::{
        book_relation::{BookRelationFields, BookRelationInput, BookRelationView},
        user::Identity,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct RelationsService {
    repository: Repository,
}

impl RelationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create or update the caller's relation to a book. A relation is
    /// created on first write, which must then carry a rate.
    pub async fn upsert(
        &self,
        identity: &Identity,
        book_id: i32,
        input: BookRelationInput,
    ) -> AppResult<BookRelationView> {
        let user = identity.require_authenticated()?;

        if let Some(body_book) = input.book {
            if body_book != book_id {
                return Err(AppError::field("book", "Book does not match the requested relation."));
            }
        }
        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book {} not found", book_id)));
        }

        let existing = self.repository.book_relations.get(user.id, book_id).await?;
        let fields = BookRelationFields::merge(existing.as_ref(), &input)?;

        let row = self
            .repository
            .book_relations
            .upsert(user.id, book_id, &fields)
            .await?;
        BookRelationView::try_from(row)
    }
}
