//! Per-user, per-book relation: like, bookmark and rating

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Rating scale, 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum Rating {
    Ok = 1,
    Fine = 2,
    Good = 3,
    Amazing = 4,
    Incredible = 5,
}

impl Rating {
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Ok => "Ok",
            Rating::Fine => "Fine",
            Rating::Good => "Good",
            Rating::Amazing => "Amazing",
            Rating::Incredible => "Incredible",
        }
    }
}

impl TryFrom<i16> for Rating {
    type Error = String;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Rating::Ok),
            2 => Ok(Rating::Fine),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Amazing),
            5 => Ok(Rating::Incredible),
            _ => Err(format!("\"{}\" is not a valid choice.", v)),
        }
    }
}

impl From<Rating> for i16 {
    fn from(r: Rating) -> Self {
        r as i16
    }
}

/// Relation row
#[derive(Debug, Clone, FromRow)]
pub struct UserBookRelation {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub liked: bool,
    pub in_bookmarks: bool,
    pub rate: i16,
}

/// Relation projection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookRelationView {
    pub book: i32,
    pub like: bool,
    pub in_bookmarks: bool,
    /// 1 (Ok) to 5 (Incredible)
    #[schema(value_type = i16, minimum = 1, maximum = 5)]
    pub rate: Rating,
}

impl TryFrom<UserBookRelation> for BookRelationView {
    type Error = AppError;

    fn try_from(row: UserBookRelation) -> Result<Self, Self::Error> {
        Ok(Self {
            book: row.book_id,
            like: row.liked,
            in_bookmarks: row.in_bookmarks,
            rate: Rating::try_from(row.rate).map_err(AppError::Internal)?,
        })
    }
}

/// Update request. Only supplied fields change.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct BookRelationInput {
    /// Must match the book in the path when given
    pub book: Option<i32>,
    pub like: Option<bool>,
    pub in_bookmarks: Option<bool>,
    #[validate(range(min = 1, max = 5, message = "Rate must be between 1 and 5."))]
    pub rate: Option<i64>,
}

/// Relation state after merging a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookRelationFields {
    pub like: bool,
    pub in_bookmarks: bool,
    pub rate: Rating,
}

impl BookRelationFields {
    /// Merges `input` onto the stored relation, or builds a new one when
    /// none exists yet (in which case `rate` is mandatory).
    pub fn merge(existing: Option<&UserBookRelation>, input: &BookRelationInput) -> AppResult<Self> {
        input.validate()?;
        let rate = match (input.rate, existing) {
            (Some(rate), _) => rate,
            (None, Some(row)) => i64::from(row.rate),
            (None, None) => return Err(AppError::field("rate", "This field is required.")),
        };
        let rate = i16::try_from(rate)
            .map_err(|_| format!("\"{}\" is not a valid choice.", rate))
            .and_then(Rating::try_from)
            .map_err(|msg| AppError::field("rate", msg))?;
        Ok(Self {
            like: input.like.or(existing.map(|r| r.liked)).unwrap_or(false),
            in_bookmarks: input
                .in_bookmarks
                .or(existing.map(|r| r.in_bookmarks))
                .unwrap_or(false),
            rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> UserBookRelation {
        UserBookRelation {
            id: 1,
            user_id: 2,
            book_id: 3,
            liked: true,
            in_bookmarks: false,
            rate: 4,
        }
    }

    #[test]
    fn test_rate_bounds() {
        for bad in [0, 6, -1] {
            let input = BookRelationInput {
                rate: Some(bad),
                ..Default::default()
            };
            assert!(matches!(
                BookRelationFields::merge(Some(&stored()), &input),
                Err(AppError::Fields(f)) if f.contains_key("rate")
            ));
        }
        assert!(Rating::try_from(6i16).is_err());
        assert_eq!(Rating::try_from(5i16).unwrap().label(), "Incredible");
    }

    #[test]
    fn test_out_of_range_rate_is_a_field_error() {
        let input: BookRelationInput = serde_json::from_str(r#"{"rate": 70000}"#).unwrap();
        assert!(matches!(
            BookRelationFields::merge(None, &input),
            Err(AppError::Fields(f)) if f.contains_key("rate")
        ));
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let input = BookRelationInput {
            in_bookmarks: Some(true),
            ..Default::default()
        };
        let merged = BookRelationFields::merge(Some(&stored()), &input).unwrap();
        assert_eq!(
            merged,
            BookRelationFields {
                like: true,
                in_bookmarks: true,
                rate: Rating::Amazing,
            }
        );
    }

    #[test]
    fn test_first_write_needs_rate() {
        let input = BookRelationInput {
            like: Some(true),
            ..Default::default()
        };
        assert!(BookRelationFields::merge(None, &input).is_err());
        let input = BookRelationInput {
            like: Some(true),
            rate: Some(2),
            ..Default::default()
        };
        let merged = BookRelationFields::merge(None, &input).unwrap();
        assert!(merged.like);
        assert!(!merged.in_bookmarks);
        assert_eq!(merged.rate, Rating::Fine);
    }

    #[test]
    fn test_rate_serializes_as_number() {
        let view = BookRelationView {
            book: 1,
            like: false,
            in_bookmarks: true,
            rate: Rating::Good,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["rate"], 3);
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }
}
