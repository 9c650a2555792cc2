//! Data models for the library catalog

pub mod author;
pub mod book;
pub mod book_instance;
pub mod book_relation;
pub mod genre;
pub mod language;
pub mod review;
pub mod user;

use crate::error::{AppError, AppResult, FieldErrors};

/// Reports every absent required field at once
pub(crate) fn require_present(fields: &[(&str, bool)]) -> AppResult<()> {
    let missing: FieldErrors = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| (name.to_string(), vec!["This field is required.".to_string()]))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Fields(missing))
    }
}

/// Public URL of a stored media path
pub fn media_url(prefix: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with('/') {
        return path.to_string();
    }
    format!("{}/{}", prefix.trim_end_matches('/'), path)
}
