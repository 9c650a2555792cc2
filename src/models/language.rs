//! Language model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Language a book is written in (e.g. English, Russian)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Language {
    pub id: i32,
    pub name: String,
}

/// Create / update language request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LanguageInput {
    #[validate(length(min = 1, max = 200, message = "Language name must be 1 to 200 characters."))]
    pub name: String,
}

impl LanguageInput {
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
    }
}
