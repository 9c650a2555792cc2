//! Review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        review::{ReviewInput, ReviewView},
        user::Identity,
    },
};

use super::JsonBody;

#[utoipa::path(
    get,
    path = "/reviews",
    tag = "reviews",
    responses(
        (status = 200, description = "List of reviews", body = Vec<ReviewView>)
    )
)]
pub async fn list_reviews(State(state): State<crate::AppState>) -> AppResult<Json<Vec<ReviewView>>> {
    let reviews = state.services.reviews.list_reviews().await?;
    Ok(Json(reviews))
}

#[utoipa::path(
    get,
    path = "/reviews/{id}",
    tag = "reviews",
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review details", body = ReviewView),
        (status = 404, description = "Review not found")
    )
)]
pub async fn get_review(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ReviewView>> {
    let review = state.services.reviews.get_review(id).await?;
    Ok(Json(review))
}

/// Publish a review as the calling user
#[utoipa::path(
    post,
    path = "/reviews",
    tag = "reviews",
    security(("bearer_auth" = []), ("session_auth" = [])),
    request_body = ReviewInput,
    responses(
        (status = 201, description = "Review created", body = ReviewView),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_review(
    State(state): State<crate::AppState>,
    identity: Identity,
    JsonBody(input): JsonBody<ReviewInput>,
) -> AppResult<(StatusCode, Json<ReviewView>)> {
    let review = state.services.reviews.create_review(&identity, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Replace a review; only its author may do so
#[utoipa::path(
    put,
    path = "/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Review ID")),
    request_body = ReviewInput,
    responses(
        (status = 200, description = "Review updated", body = ReviewView),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author of this review"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn update_review(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> AppResult<Json<ReviewView>> {
    let review = state
        .services
        .reviews
        .update_review(&identity, id, input, false)
        .await?;
    Ok(Json(review))
}

#[utoipa::path(
    patch,
    path = "/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Review ID")),
    request_body = ReviewInput,
    responses(
        (status = 200, description = "Review updated", body = ReviewView),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author of this review"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn partial_update_review(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> AppResult<Json<ReviewView>> {
    let review = state
        .services
        .reviews
        .update_review(&identity, id, input, true)
        .await?;
    Ok(Json(review))
}

#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = []), ("session_auth" = [])),
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the author of this review"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn delete_review(
    State(state): State<crate::AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.reviews.delete_review(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
