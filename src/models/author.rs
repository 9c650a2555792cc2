//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{book::RelatedBook, require_present};
use crate::error::{AppError, AppResult};

pub const DEFAULT_AUTHOR_IMAGE: &str = "default-author-image.png";

/// Author row
#[derive(Debug, Clone, FromRow)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
    pub image: String,
}

impl Author {
    pub fn fields(&self) -> AuthorFields {
        AuthorFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            middle_name: self.middle_name.clone(),
            date_of_birth: self.date_of_birth,
            date_of_death: self.date_of_death,
            image: self.image.clone(),
        }
    }
}

/// Author projection. Embedded books are summaries that carry no authors
/// of their own, which bounds Author ↔ Book nesting to a single level.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorView {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
    pub image: String,
    pub book_set: Vec<RelatedBook>,
}

/// Writable author columns after merging a request onto the stored row
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct AuthorFields {
    #[validate(length(min = 1, max = 100, message = "Ensure this field has 1 to 100 characters."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Ensure this field has 1 to 100 characters."))]
    pub last_name: String,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub middle_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
    #[validate(length(min = 1, max = 255))]
    pub image: String,
}

impl Default for AuthorFields {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            middle_name: None,
            date_of_birth: None,
            date_of_death: None,
            image: DEFAULT_AUTHOR_IMAGE.to_string(),
        }
    }
}

impl AuthorFields {
    pub fn apply(&mut self, input: AuthorInput) {
        if let Some(first_name) = input.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = input.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if let Some(middle_name) = input.middle_name {
            self.middle_name = middle_name.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
        }
        if let Some(date_of_birth) = input.date_of_birth {
            self.date_of_birth = date_of_birth;
        }
        if let Some(date_of_death) = input.date_of_death {
            self.date_of_death = date_of_death;
        }
        if let Some(image) = input.image {
            self.image = image;
        }
    }

    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let (Some(born), Some(died)) = (self.date_of_birth, self.date_of_death) {
            if died < born {
                return Err(AppError::field(
                    "date_of_death",
                    "Date of death cannot precede date of birth.",
                ));
            }
        }
        Ok(())
    }
}

/// Create / update author request. Absent fields keep their stored value;
/// nullable fields may be cleared with an explicit `null`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AuthorInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub middle_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub date_of_death: Option<Option<NaiveDate>>,
    /// Image path relative to the media root
    pub image: Option<String>,
}

impl AuthorInput {
    /// Required fields for create and full update
    pub fn require_full(&self) -> AppResult<()> {
        require_present(&[
            ("first_name", self.first_name.is_some()),
            ("last_name", self.last_name.is_some()),
        ])
    }
}

/// Author list query
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct AuthorQuery {
    /// Case-insensitive match on first or last name; every whitespace
    /// separated term must match
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_names() {
        let input = AuthorInput {
            first_name: Some("Leo".into()),
            ..Default::default()
        };
        match input.require_full().unwrap_err() {
            AppError::Fields(fields) => {
                assert!(fields.contains_key("last_name"));
                assert!(!fields.contains_key("first_name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_patch_keeps_absent_and_clears_null() {
        let mut fields = AuthorFields {
            first_name: "Lev".into(),
            last_name: "Tolstoy".into(),
            middle_name: Some("Nikolayevich".into()),
            date_of_birth: NaiveDate::from_ymd_opt(1828, 9, 9),
            date_of_death: NaiveDate::from_ymd_opt(1910, 11, 20),
            image: DEFAULT_AUTHOR_IMAGE.into(),
        };
        let input: AuthorInput =
            serde_json::from_str(r#"{"first_name": "Leo", "middle_name": null}"#).unwrap();
        fields.apply(input);
        assert_eq!(fields.first_name, "Leo");
        assert_eq!(fields.last_name, "Tolstoy");
        assert_eq!(fields.middle_name, None);
        assert!(fields.date_of_birth.is_some());
        assert!(fields.check().is_ok());
    }

    #[test]
    fn test_death_before_birth_is_rejected() {
        let mut fields = AuthorFields::default();
        fields.apply(AuthorInput {
            first_name: Some("A".into()),
            last_name: Some("B".into()),
            date_of_birth: Some(NaiveDate::from_ymd_opt(1900, 1, 1)),
            date_of_death: Some(NaiveDate::from_ymd_opt(1899, 1, 1)),
            ..Default::default()
        });
        assert!(matches!(fields.check(), Err(AppError::Fields(f)) if f.contains_key("date_of_death")));
    }
}
