//! Book copy endpoints and borrowed-copy views

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book_instance::{BookInstanceInput, BookInstanceView},
        user::{Identity, Permission},
    },
};

use super::JsonBody;

/// List every copy, earliest due date first
#[utoipa::path(
    get,
    path = "/bookcopy",
    tag = "bookcopy",
    responses(
        (status = 200, description = "List of copies", body = Vec<BookInstanceView>)
    )
)]
pub async fn list_copies(State(state): State<crate::AppState>) -> AppResult<Json<Vec<BookInstanceView>>> {
    let copies = state.services.loans.list_copies().await?;
    Ok(Json(copies))
}

#[utoipa::path(
    get,
    path = "/bookcopy/{id}",
    tag = "bookcopy",
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Copy details", body = BookInstanceView),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_copy(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstanceView>> {
    let copy = state.services.loans.get_copy(id).await?;
    Ok(Json(copy))
}

#[utoipa::path(
    post,
    path = "/bookcopy",
    tag = "bookcopy",
    security(("bearer_auth" = []), ("session_auth" = [])),
    request_body = BookInstanceInput,
    responses(
        (status = 201, description = "Copy created", body = BookInstanceView),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_copy(
    State(state): State<crate::AppState>,
    identity: Identity,
    JsonBody(input): JsonBody<BookInstanceInput>,
) -> AppResult<(StatusCode, Json<BookInstanceView>)> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let copy = state.services.loans.create_copy(input).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

#[utoipa::path(
    put,
    path = "/bookcopy/{id}",
    tag = "bookcopy",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    request_body = BookInstanceInput,
    responses(
        (status = 200, description = "Copy updated", body = BookInstanceView),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn update_copy(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<BookInstanceInput>,
) -> AppResult<Json<BookInstanceView>> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let copy = state.services.loans.update_copy(id, input, false).await?;
    Ok(Json(copy))
}

/// Update some fields of a copy; `due_back`, `inventory` and `borrower`
/// may be cleared with `null`
#[utoipa::path(
    patch,
    path = "/bookcopy/{id}",
    tag = "bookcopy",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    request_body = BookInstanceInput,
    responses(
        (status = 200, description = "Copy updated", body = BookInstanceView),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn partial_update_copy(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<BookInstanceInput>,
) -> AppResult<Json<BookInstanceView>> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    let copy = state.services.loans.update_copy(id, input, true).await?;
    Ok(Json(copy))
}

#[utoipa::path(
    delete,
    path = "/bookcopy/{id}",
    tag = "bookcopy",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn delete_copy(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    identity.require_reference_write(state.config.access.open_reference_writes)?;

    state.services.loans.delete_copy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Copies the caller has on loan, earliest due date first
#[utoipa::path(
    get,
    path = "/mybooks",
    tag = "loans",
    security(("bearer_auth" = []), ("session_auth" = [])),
    responses(
        (status = 200, description = "Borrowed copies", body = Vec<BookInstanceView>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_books(
    State(state): State<crate::AppState>,
    identity: Identity,
) -> AppResult<Json<Vec<BookInstanceView>>> {
    let user = identity.require_authenticated()?;

    let copies = state.services.loans.borrowed_by(user.id).await?;
    Ok(Json(copies))
}

/// Every copy on loan; librarians only
#[utoipa::path(
    get,
    path = "/allborrowed",
    tag = "loans",
    security(("bearer_auth" = []), ("session_auth" = [])),
    responses(
        (status = 200, description = "All borrowed copies", body = Vec<BookInstanceView>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing the can_mark_returned permission")
    )
)]
pub async fn all_borrowed(
    State(state): State<crate::AppState>,
    identity: Identity,
) -> AppResult<Json<Vec<BookInstanceView>>> {
    identity.require_perm(Permission::CanMarkReturned)?;

    let copies = state.services.loans.all_borrowed().await?;
    Ok(Json(copies))
}
