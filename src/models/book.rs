//! Book model, projections and request types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{
    author::AuthorView, book_instance::BookInstanceView, genre::GenreName, require_present,
    review::ReviewView,
};
use crate::error::AppResult;

pub const DEFAULT_BOOK_IMAGE: &str = "default-book-cover.png";
pub const DEFAULT_SUMMARY: &str = "Summary not available";

/// Book row
#[derive(Debug, Clone, FromRow)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub image: String,
    pub summary: String,
    pub isbn: String,
    pub bbk: Option<String>,
    pub copy_sign: Option<String>,
    pub pages: Option<i16>,
    pub language_id: i32,
    /// Joined from `languages`
    pub language: String,
}

/// Full book projection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookView {
    pub id: i32,
    pub title: String,
    pub authors: Vec<AuthorView>,
    pub image: String,
    pub summary: String,
    pub isbn: String,
    pub bbk: Option<String>,
    pub copy_sign: Option<String>,
    pub pages: Option<i16>,
    pub language: String,
    pub genre: Vec<GenreName>,
    pub bookinstance_set: Vec<BookInstanceView>,
    pub review_set: Vec<ReviewView>,
}

/// Book summary embedded in an author projection ("more by this author")
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelatedBook {
    pub id: i32,
    pub title: String,
    pub image: String,
    pub summary: String,
    pub bookinstance_set: Vec<Uuid>,
}

/// Strips separators from a typed ISBN: `978-5-17-090630-7` → `9785170906307`
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Accepts a normalized ISBN-10 (trailing X allowed) or ISBN-13
fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    // byte lengths below only hold for ASCII input
    let valid = isbn.is_ascii()
        && match isbn.len() {
            13 => isbn.chars().all(|c| c.is_ascii_digit()),
            10 => {
                let (body, check) = isbn.split_at(9);
                body.chars().all(|c| c.is_ascii_digit())
                    && check.chars().all(|c| c.is_ascii_digit() || c == 'X')
            }
            _ => false,
        };
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("isbn");
        err.message = Some("Enter a 10 or 13 character ISBN.".into());
        Err(err)
    }
}

/// Writable book columns and joins after merging a request onto the stored row
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct BookFields {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters."))]
    pub title: String,
    #[validate(length(min = 1, max = 255))]
    pub image: String,
    #[validate(length(min = 1, max = 1500, message = "Ensure this field has no more than 1500 characters."))]
    pub summary: String,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: String,
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub bbk: Option<String>,
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub copy_sign: Option<String>,
    #[validate(range(min = 1, max = 32767, message = "Ensure this value is between 1 and 32767."))]
    pub pages: Option<i32>,
    pub language_id: i32,
    pub author_ids: Vec<i32>,
    #[validate(length(min = 1, message = "Select at least one genre."))]
    pub genre_ids: Vec<i32>,
}

impl Default for BookFields {
    fn default() -> Self {
        Self {
            title: String::new(),
            image: DEFAULT_BOOK_IMAGE.to_string(),
            summary: DEFAULT_SUMMARY.to_string(),
            isbn: String::new(),
            bbk: None,
            copy_sign: None,
            pages: None,
            language_id: 0,
            author_ids: Vec::new(),
            genre_ids: Vec::new(),
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn dedup(mut ids: Vec<i32>) -> Vec<i32> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

impl BookFields {
    pub fn from_book(book: &Book, author_ids: Vec<i32>, genre_ids: Vec<i32>) -> Self {
        Self {
            title: book.title.clone(),
            image: book.image.clone(),
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            bbk: book.bbk.clone(),
            copy_sign: book.copy_sign.clone(),
            pages: book.pages.map(i32::from),
            language_id: book.language_id,
            author_ids,
            genre_ids,
        }
    }

    pub fn apply(&mut self, input: BookInput) {
        if let Some(title) = input.title {
            self.title = title.trim().to_string();
        }
        if let Some(image) = input.image {
            self.image = image;
        }
        if let Some(summary) = input.summary {
            self.summary = summary;
        }
        if let Some(isbn) = input.isbn {
            self.isbn = normalize_isbn(&isbn);
        }
        if let Some(bbk) = input.bbk {
            self.bbk = blank_to_none(bbk);
        }
        if let Some(copy_sign) = input.copy_sign {
            self.copy_sign = blank_to_none(copy_sign);
        }
        if let Some(pages) = input.pages {
            self.pages = pages;
        }
        if let Some(language) = input.language {
            self.language_id = language;
        }
        if let Some(authors) = input.authors {
            self.author_ids = dedup(authors);
        }
        if let Some(genre) = input.genre {
            self.genre_ids = dedup(genre);
        }
    }
}

/// Create / update book request.
///
/// `authors`, `genre` and `language` carry ids of existing rows. Absent
/// fields keep their stored value on update.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    pub title: Option<String>,
    pub authors: Option<Vec<i32>>,
    pub image: Option<String>,
    pub summary: Option<String>,
    /// As typed, separators included (`978-5-17-090630-7`)
    #[validate(length(max = 17, message = "Ensure this field has no more than 17 characters."))]
    pub isbn: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub bbk: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub copy_sign: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub pages: Option<Option<i32>>,
    pub genre: Option<Vec<i32>>,
    pub language: Option<i32>,
}

impl BookInput {
    /// Required fields for create and full update
    pub fn require_full(&self) -> AppResult<()> {
        require_present(&[
            ("title", self.title.is_some()),
            ("isbn", self.isbn.is_some()),
            ("genre", self.genre.is_some()),
            ("language", self.language.is_some()),
        ])
    }
}

/// Book list query
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive match on title or author first/last name; every
    /// whitespace separated term must match
    pub search: Option<String>,
    /// Exact title filter
    pub title: Option<String>,
}

impl BookQuery {
    /// Exact title to filter on. An empty `?title=` does not filter.
    pub fn title_filter(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }
}

/// Splits a search string into lower-cased terms
pub fn search_terms(search: Option<&str>) -> Vec<String> {
    search
        .map(|s| s.split_whitespace().map(str::to_lowercase).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn valid_fields() -> BookFields {
        BookFields {
            title: "War and Peace".into(),
            isbn: "9785170906307".into(),
            language_id: 1,
            genre_ids: vec![1],
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_isbn() {
        assert_eq!(normalize_isbn("978-5-17-090630-7"), "9785170906307");
        assert_eq!(normalize_isbn("0 306 40615 x"), "030640615X");
    }

    #[test]
    fn test_isbn_rules() {
        assert!(validate_isbn("9785170906307").is_ok());
        assert!(validate_isbn("030640615X").is_ok());
        assert!(validate_isbn("97851709063").is_err());
        assert!(validate_isbn("X306406152").is_err());
        assert!(validate_isbn("978517090630A").is_err());
    }

    #[test]
    fn test_multibyte_isbn_is_rejected() {
        let isbn = normalize_isbn("12345678é");
        assert_eq!(isbn.len(), 10);
        assert!(validate_isbn(&isbn).is_err());
        assert!(validate_isbn("978517090é3").is_err());

        let mut fields = valid_fields();
        fields.isbn = isbn;
        let errors = fields.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("isbn"));
    }

    #[test]
    fn test_typed_isbn_up_to_17_chars() {
        let input = BookInput {
            isbn: Some("978-5-17-090630-7".into()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
        let input = BookInput {
            isbn: Some("978--5--17--090630--7".into()),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_missing_language_fails_create() {
        let input = BookInput {
            title: Some("Dune".into()),
            isbn: Some("9780441172719".into()),
            genre: Some(vec![1]),
            ..Default::default()
        };
        match input.require_full().unwrap_err() {
            AppError::Fields(fields) => assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["language"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_summary_limit_and_pages() {
        let mut fields = valid_fields();
        assert!(fields.validate().is_ok());
        fields.summary = "x".repeat(1501);
        assert!(fields.validate().is_err());
        fields.summary = DEFAULT_SUMMARY.into();
        fields.pages = Some(0);
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_oversized_pages_is_a_field_error() {
        let input: BookInput = serde_json::from_str(r#"{"pages": 70000}"#).unwrap();
        let mut fields = valid_fields();
        fields.apply(input);
        let err: AppError = fields.validate().unwrap_err().into();
        match err {
            AppError::Fields(fields) => assert!(fields.contains_key("pages")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_apply_patch() {
        let mut fields = valid_fields();
        let input: BookInput =
            serde_json::from_str(r#"{"bbk": "84(2Рос=Рус)1", "pages": null, "authors": [3, 2, 3]}"#)
                .unwrap();
        fields.apply(input);
        assert_eq!(fields.title, "War and Peace");
        assert_eq!(fields.bbk.as_deref(), Some("84(2Рос=Рус)1"));
        assert_eq!(fields.pages, None);
        assert_eq!(fields.author_ids, vec![2, 3]);
    }

    #[test]
    fn test_empty_title_does_not_filter() {
        let query: BookQuery = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert_eq!(query.title_filter(), None);
        let query: BookQuery = serde_json::from_str(r#"{"title": "Dune"}"#).unwrap();
        assert_eq!(query.title_filter(), Some("Dune"));
        assert_eq!(BookQuery::default().title_filter(), None);
    }

    #[test]
    fn test_search_terms() {
        assert_eq!(search_terms(Some("  Leo  TOLSTOY ")), vec!["leo", "tolstoy"]);
        assert!(search_terms(None).is_empty());
    }
}
