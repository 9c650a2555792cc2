//! Reviews service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        review::{ReviewFields, ReviewInput, ReviewView},
        user::Identity,
    },
    repository::Repository,
    services::catalog::invalid_pk,
};

#[derive(Clone)]
pub struct ReviewsService {
    repository: Repository,
}

impl ReviewsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_reviews(&self) -> AppResult<Vec<ReviewView>> {
        let reviews = self.repository.reviews.list().await?;
        Ok(reviews.into_iter().map(Into::into).collect())
    }

    pub async fn get_review(&self, id: i32) -> AppResult<ReviewView> {
        Ok(self.repository.reviews.get_by_id(id).await?.into())
    }

    /// Publish a review authored by the caller
    pub async fn create_review(&self, identity: &Identity, input: ReviewInput) -> AppResult<ReviewView> {
        let user = identity.require_authenticated()?;
        input.require_full()?;

        let mut fields = ReviewFields::default();
        fields.apply(input);
        self.check_review(&fields).await?;

        let id = self.repository.reviews.create(user.id, &fields).await?;
        tracing::info!(review_id = id, book_id = fields.book_id, user_id = user.id, "Review published");
        self.get_review(id).await
    }

    /// Only the author may change a review
    pub async fn update_review(
        &self,
        identity: &Identity,
        id: i32,
        input: ReviewInput,
        partial: bool,
    ) -> AppResult<ReviewView> {
        identity.require_authenticated()?;
        let review = self.repository.reviews.get_by_id(id).await?;
        self.require_owner(identity, id, review.author_id)?;

        if !partial {
            input.require_full()?;
        }
        let mut fields = review.fields();
        fields.apply(input);
        self.check_review(&fields).await?;

        self.repository.reviews.update(id, &fields).await?;
        self.get_review(id).await
    }

    pub async fn delete_review(&self, identity: &Identity, id: i32) -> AppResult<()> {
        identity.require_authenticated()?;
        let review = self.repository.reviews.get_by_id(id).await?;
        self.require_owner(identity, id, review.author_id)?;

        self.repository.reviews.delete(id).await
    }

    fn require_owner(&self, identity: &Identity, review_id: i32, author_id: Option<i32>) -> AppResult<()> {
        identity.require_review_owner(author_id).map(|_| ()).map_err(|e| {
            tracing::warn!(
                review_id,
                user_id = identity.user().map(|u| u.id),
                "Refused change to another user's review"
            );
            e
        })
    }

    async fn check_review(&self, fields: &ReviewFields) -> AppResult<()> {
        fields.validate()?;
        if !self.repository.books.exists(fields.book_id).await? {
            return Err(invalid_pk("book", fields.book_id));
        }
        Ok(())
    }
}
