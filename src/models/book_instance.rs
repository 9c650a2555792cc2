//! Book instance (physical copy) model and related types

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{require_present, user::PublicUser};
use crate::error::AppResult;

/// Availability of a copy. Stored as a one-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    pub fn code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(LoanStatus::Maintenance),
            "o" => Ok(LoanStatus::OnLoan),
            "a" => Ok(LoanStatus::Available),
            "r" => Ok(LoanStatus::Reserved),
            _ => Err(format!("Invalid loan status code: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.code(), buf)
    }
}

/// Copy row joined with its borrower
#[derive(Debug, Clone, FromRow)]
pub struct BookInstance {
    pub id: Uuid,
    pub inventory: Option<String>,
    pub book_id: i32,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub borrower_id: Option<i32>,
    pub borrower_username: Option<String>,
    pub borrower_first_name: Option<String>,
    pub borrower_last_name: Option<String>,
}

impl BookInstance {
    /// True iff a due date is set and lies strictly before `today`
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        matches!(self.due_back, Some(due) if due < today)
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_on(Utc::now().date_naive())
    }

    pub fn fields(&self) -> BookInstanceFields {
        BookInstanceFields {
            book_id: self.book_id,
            inventory: self.inventory.clone(),
            imprint: self.imprint.clone(),
            due_back: self.due_back,
            status: self.status,
            borrower_id: self.borrower_id,
        }
    }
}

/// Copy projection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookInstanceView {
    pub id: Uuid,
    pub book: i32,
    pub inventory: Option<String>,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub is_overdue: bool,
    pub borrower: Option<PublicUser>,
}

impl From<BookInstance> for BookInstanceView {
    fn from(copy: BookInstance) -> Self {
        let is_overdue = copy.is_overdue();
        Self {
            id: copy.id,
            book: copy.book_id,
            inventory: copy.inventory,
            imprint: copy.imprint,
            due_back: copy.due_back,
            status: copy.status,
            is_overdue,
            borrower: PublicUser::from_parts(
                copy.borrower_id,
                copy.borrower_username,
                copy.borrower_first_name,
                copy.borrower_last_name,
            ),
        }
    }
}

/// Writable copy columns after merging a request onto the stored row
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct BookInstanceFields {
    pub book_id: i32,
    #[validate(length(min = 1, max = 20, message = "Ensure this field has 1 to 20 characters."))]
    pub inventory: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Ensure this field has 1 to 200 characters."))]
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub borrower_id: Option<i32>,
}

impl BookInstanceFields {
    pub fn apply(&mut self, input: BookInstanceInput) {
        if let Some(book) = input.book {
            self.book_id = book;
        }
        if let Some(inventory) = input.inventory {
            self.inventory = inventory.map(|i| i.trim().to_string()).filter(|i| !i.is_empty());
        }
        if let Some(imprint) = input.imprint {
            self.imprint = imprint.trim().to_string();
        }
        if let Some(due_back) = input.due_back {
            self.due_back = due_back;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        if let Some(borrower) = input.borrower {
            self.borrower_id = borrower;
        }
    }
}

/// Create / update copy request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BookInstanceInput {
    /// Book id
    pub book: Option<i32>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub inventory: Option<Option<String>>,
    pub imprint: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub due_back: Option<Option<NaiveDate>>,
    pub status: Option<LoanStatus>,
    /// Borrower user id
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub borrower: Option<Option<i32>>,
}

impl BookInstanceInput {
    /// Required fields for create and full update
    pub fn require_full(&self) -> AppResult<()> {
        require_present(&[
            ("book", self.book.is_some()),
            ("imprint", self.imprint.is_some()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy(due_back: Option<NaiveDate>) -> BookInstance {
        BookInstance {
            id: Uuid::new_v4(),
            inventory: None,
            book_id: 1,
            imprint: "Moscow: AST, 2016".into(),
            due_back,
            status: LoanStatus::OnLoan,
            borrower_id: None,
            borrower_username: None,
            borrower_first_name: None,
            borrower_last_name: None,
        }
    }

    #[test]
    fn test_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert!(copy(NaiveDate::from_ymd_opt(2024, 3, 9)).is_overdue_on(today));
        assert!(!copy(Some(today)).is_overdue_on(today));
        assert!(!copy(NaiveDate::from_ymd_opt(2024, 3, 11)).is_overdue_on(today));
        assert!(!copy(None).is_overdue_on(today));
    }

    #[test]
    fn test_status_codes() {
        for status in [
            LoanStatus::Maintenance,
            LoanStatus::OnLoan,
            LoanStatus::Available,
            LoanStatus::Reserved,
        ] {
            assert_eq!(status.code().parse::<LoanStatus>().unwrap(), status);
        }
        assert!("x".parse::<LoanStatus>().is_err());
        assert_eq!(LoanStatus::default(), LoanStatus::Maintenance);
    }

    #[test]
    fn test_status_wire_form() {
        assert_eq!(serde_json::to_string(&LoanStatus::OnLoan).unwrap(), "\"on_loan\"");
        let input: BookInstanceInput =
            serde_json::from_str(r#"{"status": "available", "borrower": null}"#).unwrap();
        assert_eq!(input.status, Some(LoanStatus::Available));
        assert_eq!(input.borrower, Some(None));
        assert_eq!(input.due_back, None);
    }

    #[test]
    fn test_view_hides_missing_borrower() {
        let view = BookInstanceView::from(copy(None));
        assert!(view.borrower.is_none());
        assert!(!view.is_overdue);
    }

    #[test]
    fn test_create_requires_book_and_imprint() {
        assert!(BookInstanceInput::default().require_full().is_err());
    }
}
