//! Library catalog server
//!
//! REST JSON API over a library catalog: books, authors, genres, languages,
//! physical copies and loans, reviews, and per-reader likes, bookmarks and
//! ratings. A companion chat bot lists the catalog's titles.

use std::sync::Arc;

pub mod api;
pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
