//! Review model and related types

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{require_present, user::PublicUser};
use crate::error::AppResult;

/// Display form of a publication timestamp: `05 February 2023, 16:05`
pub const PUB_DATE_FORMAT: &str = "%d %B %Y, %H:%M";

pub fn format_pub_date<Tz: TimeZone>(pub_date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    pub_date.format(PUB_DATE_FORMAT).to_string()
}

/// Review row joined with its author
#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: i32,
    pub title: String,
    pub review_text: String,
    pub author_id: Option<i32>,
    pub book_id: i32,
    pub pub_date: DateTime<Utc>,
    pub author_username: Option<String>,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
}

impl Review {
    pub fn fields(&self) -> ReviewFields {
        ReviewFields {
            title: self.title.clone(),
            review_text: self.review_text.clone(),
            book_id: self.book_id,
        }
    }
}

/// Review projection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewView {
    pub id: i32,
    pub title: String,
    pub review_text: String,
    pub author: Option<PublicUser>,
    /// Human-readable publication date (UTC)
    pub pub_date: String,
    pub book: i32,
}

impl From<Review> for ReviewView {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            title: review.title,
            review_text: review.review_text,
            author: PublicUser::from_parts(
                review.author_id,
                review.author_username,
                review.author_first_name,
                review.author_last_name,
            ),
            pub_date: format_pub_date(&review.pub_date),
            book: review.book_id,
        }
    }
}

/// Writable review columns. `author` and `pub_date` are set on creation only.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct ReviewFields {
    #[validate(length(min = 1, max = 100, message = "Ensure this field has 1 to 100 characters."))]
    pub title: String,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub review_text: String,
    pub book_id: i32,
}

impl ReviewFields {
    pub fn apply(&mut self, input: ReviewInput) {
        if let Some(title) = input.title {
            self.title = title.trim().to_string();
        }
        if let Some(review_text) = input.review_text {
            self.review_text = review_text;
        }
        if let Some(book) = input.book {
            self.book_id = book;
        }
    }
}

/// Create / update review request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewInput {
    pub title: Option<String>,
    pub review_text: Option<String>,
    /// Book id
    pub book: Option<i32>,
}

impl ReviewInput {
    pub fn require_full(&self) -> AppResult<()> {
        require_present(&[
            ("title", self.title.is_some()),
            ("review_text", self.review_text.is_some()),
            ("book", self.book.is_some()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pub_date_format() {
        let at = Utc.with_ymd_and_hms(2023, 2, 5, 16, 5, 0).unwrap();
        assert_eq!(format_pub_date(&at), "05 February 2023, 16:05");
    }

    #[test]
    fn test_view_of_orphaned_review() {
        let review = Review {
            id: 1,
            title: "Great".into(),
            review_text: "Loved it".into(),
            author_id: None,
            book_id: 4,
            pub_date: Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap(),
            author_username: None,
            author_first_name: None,
            author_last_name: None,
        };
        let view = ReviewView::from(review);
        assert!(view.author.is_none());
        assert_eq!(view.pub_date, "31 December 2024, 23:59");
    }

    #[test]
    fn test_blank_text_rejected() {
        let mut fields = ReviewFields::default();
        fields.apply(ReviewInput {
            title: Some("Title".into()),
            review_text: Some(String::new()),
            book: Some(1),
        });
        assert!(fields.validate().is_err());
    }
}
