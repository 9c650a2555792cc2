//! Author endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        author::{AuthorInput, AuthorQuery, AuthorView},
        user::Identity,
    },
};

use super::JsonBody;

/// List authors, optionally searched by name
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    params(AuthorQuery),
    responses(
        (status = 200, description = "List of authors", body = Vec<AuthorView>)
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    Query(query): Query<AuthorQuery>,
) -> AppResult<Json<Vec<AuthorView>>> {
    let authors = state.services.catalog.list_authors(&query).await?;
    Ok(Json(authors))
}

#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = AuthorView),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorView>> {
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    security(("bearer_auth" = []), ("session_auth" = [])),
    request_body = AuthorInput,
    responses(
        (status = 201, description = "Author created", body = AuthorView),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    identity: Identity,
    JsonBody(input): JsonBody<AuthorInput>,
) -> AppResult<(StatusCode, Json<AuthorView>)> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let author = state.services.catalog.create_author(input).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body = AuthorInput,
    responses(
        (status = 200, description = "Author updated", body = AuthorView),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    JsonBody(input): JsonBody<AuthorInput>,
) -> AppResult<Json<AuthorView>> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let author = state.services.catalog.update_author(id, input, false).await?;
    Ok(Json(author))
}

#[utoipa::path(
    patch,
    path = "/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body = AuthorInput,
    responses(
        (status = 200, description = "Author updated", body = AuthorView),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn partial_update_author(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    JsonBody(input): JsonBody<AuthorInput>,
) -> AppResult<Json<AuthorView>> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let author = state.services.catalog.update_author(id, input, true).await?;
    Ok(Json(author))
}

/// Delete an author. Their books are kept.
#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    state.services.catalog.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
