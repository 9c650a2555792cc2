//! Language endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        language::{Language, LanguageInput},
        user::Identity,
    },
};

use super::JsonBody;

#[utoipa::path(
    get,
    path = "/languages",
    tag = "languages",
    responses(
        (status = 200, description = "List of languages", body = Vec<Language>)
    )
)]
pub async fn list_languages(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Language>>> {
    let languages = state.services.catalog.list_languages().await?;
    Ok(Json(languages))
}

#[utoipa::path(
    get,
    path = "/languages/{id}",
    tag = "languages",
    params(("id" = i32, Path, description = "Language ID")),
    responses(
        (status = 200, description = "Language details", body = Language),
        (status = 404, description = "Language not found")
    )
)]
pub async fn get_language(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Language>> {
    let language = state.services.catalog.get_language(id).await?;
    Ok(Json(language))
}

#[utoipa::path(
    post,
    path = "/languages",
    tag = "languages",
    security(("bearer_auth" = []), ("session_auth" = [])),
    request_body = LanguageInput,
    responses(
        (status = 201, description = "Language created", body = Language),
        (status = 400, description = "Invalid or duplicate name")
    )
)]
pub async fn create_language(
    State(state): State<crate::AppState>,
    identity: Identity,
    JsonBody(input): JsonBody<LanguageInput>,
) -> AppResult<(StatusCode, Json<Language>)> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let language = state.services.catalog.create_language(input).await?;
    Ok((StatusCode::CREATED, Json(language)))
}

/// Rename a language (PUT and PATCH)
#[utoipa::path(
    put,
    path = "/languages/{id}",
    tag = "languages",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Language ID")),
    request_body = LanguageInput,
    responses(
        (status = 200, description = "Language updated", body = Language),
        (status = 400, description = "Invalid or duplicate name"),
        (status = 404, description = "Language not found")
    )
)]
pub async fn update_language(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    JsonBody(input): JsonBody<LanguageInput>,
) -> AppResult<Json<Language>> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let language = state.services.catalog.update_language(id, input).await?;
    Ok(Json(language))
}

/// Delete a language together with its books.
/// Refused while any of those books has copies.
#[utoipa::path(
    delete,
    path = "/languages/{id}",
    tag = "languages",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Language ID")),
    responses(
        (status = 204, description = "Language and its books deleted"),
        (status = 404, description = "Language not found"),
        (status = 409, description = "A book in this language still has copies")
    )
)]
pub async fn delete_language(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    state.services.catalog.delete_language(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
