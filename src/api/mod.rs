//! API handlers for the library REST endpoints

pub mod account;
pub mod authors;
pub mod book_copies;
pub mod book_relations;
pub mod books;
pub mod genres;
pub mod health;
pub mod languages;
pub mod openapi;
pub mod reviews;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Method},
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::CookieJar;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::Identity, AppState};

/// Cookie carrying the session key
pub const SESSION_COOKIE: &str = "sessionid";
/// Cookie carrying the CSRF token echoed by unsafe session requests
pub const CSRF_COOKIE: &str = "csrftoken";
/// Header the CSRF token must be echoed in
pub const CSRF_HEADER: &str = "x-csrftoken";

/// JSON body whose rejections render as `AppError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// GET, HEAD, OPTIONS and TRACE never need a CSRF token
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

/// The header must echo a non-empty CSRF cookie exactly
pub fn csrf_matches(header: Option<&str>, cookie: Option<&str>) -> bool {
    match (header, cookie) {
        (Some(header), Some(cookie)) => !cookie.is_empty() && header == cookie,
        _ => false,
    }
}

fn check_csrf(headers: &HeaderMap, jar: &CookieJar) -> Result<(), AppError> {
    let header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    let cookie = jar.get(CSRF_COOKIE).map(|c| c.value());
    if csrf_matches(header, cookie) {
        Ok(())
    } else {
        tracing::warn!("CSRF check failed");
        Err(AppError::Authorization(
            "CSRF Failed: CSRF token missing or incorrect.".to_string(),
        ))
    }
}

/// Resolves the caller from a bearer token or a session cookie.
/// Requests carrying neither are anonymous.
#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(auth_header) = parts.headers.get(AUTHORIZATION) {
            let token = auth_header
                .to_str()
                .ok()
                .and_then(|value| value.strip_prefix("Bearer "))
                .ok_or_else(|| {
                    AppError::Authentication("Invalid authorization header format".to_string())
                })?;
            return state.services.users.resolve_token(token.trim()).await;
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let Some(session) = jar.get(SESSION_COOKIE) else {
            return Ok(Identity::Anonymous);
        };

        let identity = state.services.users.resolve_session(session.value()).await?;
        if matches!(identity, Identity::User(_)) && !is_safe_method(&parts.method) {
            check_csrf(&parts.headers, &jar)?;
        }
        Ok(identity)
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Account
        .route("/account/login", post(account::login))
        .route("/account/register", post(account::register))
        .route("/accounts/logout", post(account::logout))
        .route("/auth/token", post(account::token))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .patch(books::partial_update_book)
                .delete(books::delete_book),
        )
        // Authors
        .route("/authors", get(authors::list_authors).post(authors::create_author))
        .route(
            "/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .patch(authors::partial_update_author)
                .delete(authors::delete_author),
        )
        // Genres
        .route("/genres", get(genres::list_genres).post(genres::create_genre))
        .route(
            "/genres/:id",
            get(genres::get_genre)
                .put(genres::update_genre)
                .patch(genres::update_genre)
                .delete(genres::delete_genre),
        )
        // Languages
        .route("/languages", get(languages::list_languages).post(languages::create_language))
        .route(
            "/languages/:id",
            get(languages::get_language)
                .put(languages::update_language)
                .patch(languages::update_language)
                .delete(languages::delete_language),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::partial_update_user)
                .delete(users::delete_user),
        )
        // Reviews
        .route("/reviews", get(reviews::list_reviews).post(reviews::create_review))
        .route(
            "/reviews/:id",
            get(reviews::get_review)
                .put(reviews::update_review)
                .patch(reviews::partial_update_review)
                .delete(reviews::delete_review),
        )
        // Reader relations
        .route(
            "/book_relation/:book_id",
            put(book_relations::update_relation).patch(book_relations::update_relation),
        )
        // Copies and loans
        .route("/bookcopy", get(book_copies::list_copies).post(book_copies::create_copy))
        .route(
            "/bookcopy/:id",
            get(book_copies::get_copy)
                .put(book_copies::update_copy)
                .patch(book_copies::partial_update_copy)
                .delete(book_copies::delete_copy),
        )
        .route("/mybooks", get(book_copies::my_books))
        .route("/allborrowed", get(book_copies::all_borrowed))
        .with_state(state.clone());

    let mut app = Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router());

    let media_prefix = state.config.media.url_prefix.trim_end_matches('/');
    if media_prefix.starts_with('/') && media_prefix.len() > 1 {
        app = app.nest_service(media_prefix, ServeDir::new(&state.config.media.root));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::PATCH));
        assert!(!is_safe_method(&Method::DELETE));
    }

    #[test]
    fn test_csrf_rule() {
        assert!(csrf_matches(Some("abc"), Some("abc")));
        assert!(!csrf_matches(Some("abc"), Some("abd")));
        assert!(!csrf_matches(None, Some("abc")));
        assert!(!csrf_matches(Some("abc"), None));
        assert!(!csrf_matches(Some(""), Some("")));
    }
}
