//! Genre endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        genre::{Genre, GenreInput},
        user::Identity,
    },
};

use super::JsonBody;

/// List genres ordered by name
#[utoipa::path(
    get,
    path = "/genres",
    tag = "genres",
    responses(
        (status = 200, description = "List of genres", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Genre>>> {
    let genres = state.services.catalog.list_genres().await?;
    Ok(Json(genres))
}

#[utoipa::path(
    get,
    path = "/genres/{id}",
    tag = "genres",
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "Genre details", body = Genre),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn get_genre(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Genre>> {
    let genre = state.services.catalog.get_genre(id).await?;
    Ok(Json(genre))
}

#[utoipa::path(
    post,
    path = "/genres",
    tag = "genres",
    security(("bearer_auth" = []), ("session_auth" = [])),
    request_body = GenreInput,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 400, description = "Invalid or duplicate name")
    )
)]
pub async fn create_genre(
    State(state): State<crate::AppState>,
    identity: Identity,
    JsonBody(input): JsonBody<GenreInput>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let genre = state.services.catalog.create_genre(input).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

/// Rename a genre (PUT and PATCH)
#[utoipa::path(
    put,
    path = "/genres/{id}",
    tag = "genres",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    request_body = GenreInput,
    responses(
        (status = 200, description = "Genre updated", body = Genre),
        (status = 400, description = "Invalid or duplicate name"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn update_genre(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    JsonBody(input): JsonBody<GenreInput>,
) -> AppResult<Json<Genre>> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let genre = state.services.catalog.update_genre(id, input).await?;
    Ok(Json(genre))
}

/// Delete a genre. Books lose the genre but are kept.
#[utoipa::path(
    delete,
    path = "/genres/{id}",
    tag = "genres",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Genre ID")),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn delete_genre(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    state.services.catalog.delete_genre(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
