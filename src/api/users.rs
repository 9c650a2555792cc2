//! User management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{CreateUser, Identity, UpdateUser, UserView},
};

use super::JsonBody;

/// List users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "List of users", body = Vec<UserView>)
    )
)]
pub async fn list_users(State(state): State<crate::AppState>) -> AppResult<Json<Vec<UserView>>> {
    let users = state.services.users.list_users().await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserView),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<UserView>> {
    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user.into()))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = []), ("session_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserView),
        (status = 400, description = "Invalid input or username taken")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    identity: Identity,
    JsonBody(user): JsonBody<CreateUser>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let created = state.services.users.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Replace a user; username and password are required
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserView),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    JsonBody(user): JsonBody<UpdateUser>,
) -> AppResult<Json<UserView>> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let updated = state.services.users.update_user(id, user, false).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserView),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "User not found")
    )
)]
pub async fn partial_update_user(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    JsonBody(user): JsonBody<UpdateUser>,
) -> AppResult<Json<UserView>> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let updated = state.services.users.update_user(id, user, true).await?;
    Ok(Json(updated.into()))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
