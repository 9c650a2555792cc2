//! Reader ↔ book relation endpoint

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book_relation::{BookRelationInput, BookRelationView},
        user::Identity,
    },
};

use super::JsonBody;

/// Like, bookmark or rate a book as the calling user.
///
/// Served for both PUT and PATCH; only supplied fields change. The first
/// write for a book creates the relation and must include `rate`.
#[utoipa::path(
    patch,
    path = "/book_relation/{book_id}",
    tag = "book_relation",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("book_id" = i32, Path, description = "Book ID")),
    request_body = BookRelationInput,
    responses(
        (status = 200, description = "Relation updated", body = BookRelationView),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_relation(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(book_id): Path<i32>,
    JsonBody(input): JsonBody<BookRelationInput>,
) -> AppResult<Json<BookRelationView>> {
    let relation = state
        .services
        .relations
        .upsert(&identity, book_id, input)
        .await?;
    Ok(Json(relation))
}
