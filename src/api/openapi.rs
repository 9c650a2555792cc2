//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    account, authors, book_copies, book_relations, books, genres, health, languages, reviews, users,
};

/// Registers the bearer token and session cookie schemes
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "session_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(super::SESSION_COOKIE))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library catalog REST API: books, authors, copies, reviews and reader relations",
        license(name = "MIT")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Account
        account::login,
        account::logout,
        account::register,
        account::token,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::partial_update_book,
        books::delete_book,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::partial_update_author,
        authors::delete_author,
        // Genres
        genres::list_genres,
        genres::get_genre,
        genres::create_genre,
        genres::update_genre,
        genres::delete_genre,
        // Languages
        languages::list_languages,
        languages::get_language,
        languages::create_language,
        languages::update_language,
        languages::delete_language,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::partial_update_user,
        users::delete_user,
        // Reviews
        reviews::list_reviews,
        reviews::get_review,
        reviews::create_review,
        reviews::update_review,
        reviews::partial_update_review,
        reviews::delete_review,
        // Relations
        book_relations::update_relation,
        // Copies and loans
        book_copies::list_copies,
        book_copies::get_copy,
        book_copies::create_copy,
        book_copies::update_copy,
        book_copies::partial_update_copy,
        book_copies::delete_copy,
        book_copies::my_books,
        book_copies::all_borrowed,
    ),
    components(
        schemas(
            // Account
            account::LoginRequest,
            account::LoginResponse,
            account::TokenResponse,
            // Books
            crate::models::book::BookView,
            crate::models::book::BookInput,
            crate::models::book::BookQuery,
            crate::models::book::RelatedBook,
            // Authors
            crate::models::author::AuthorView,
            crate::models::author::AuthorInput,
            crate::models::author::AuthorQuery,
            // Genres and languages
            crate::models::genre::Genre,
            crate::models::genre::GenreName,
            crate::models::genre::GenreInput,
            crate::models::language::Language,
            crate::models::language::LanguageInput,
            // Copies
            crate::models::book_instance::BookInstanceView,
            crate::models::book_instance::BookInstanceInput,
            crate::models::book_instance::LoanStatus,
            // Reviews
            crate::models::review::ReviewView,
            crate::models::review::ReviewInput,
            // Relations
            crate::models::book_relation::BookRelationView,
            crate::models::book_relation::BookRelationInput,
            // Users
            crate::models::user::UserView,
            crate::models::user::PublicUser,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "account", description = "Login, logout, registration and tokens"),
        (name = "books", description = "Book catalog"),
        (name = "authors", description = "Authors"),
        (name = "genres", description = "Genres"),
        (name = "languages", description = "Languages"),
        (name = "users", description = "User management"),
        (name = "reviews", description = "Book reviews"),
        (name = "book_relation", description = "Likes, bookmarks and ratings"),
        (name = "bookcopy", description = "Physical copies"),
        (name = "loans", description = "Borrowed copies")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/books", "/books/{id}", "/book_relation/{book_id}", "/mybooks", "/allborrowed"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.security_schemes.contains_key("session_auth"));
    }
}
