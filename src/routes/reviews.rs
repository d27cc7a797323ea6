use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{
        AverageRating, CreatedResponse, MessageResponse, NewReview, Review, ReviewUpdate,
        UserReview,
    },
    routes::AppState,
};

fn review_not_found() -> AppError {
    AppError::NotFound("Review not found".to_string())
}

/// Handler for posting a review
pub async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(review): Json<NewReview>,
) -> AppResult<Json<CreatedResponse>> {
    review.validate()?;

    if state.catalog.get_title(&review.show_id).await?.is_none() {
        return Err(AppError::NotFound("Title not found".to_string()));
    }

    let id = state.reviews.create_review(user.id, &review).await?;

    tracing::info!(
        user_id = %user.id,
        show_id = %review.show_id,
        rating = review.rating,
        "Review created"
    );

    Ok(Json(CreatedResponse { id }))
}

/// Handler listing a title's reviews
pub async fn for_title(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<String>,
) -> AppResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.reviews_for_title(&show_id).await?))
}

/// Handler for a title's average rating
pub async fn average(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<String>,
) -> AppResult<Json<AverageRating>> {
    let average_rating = state.reviews.average_rating(&show_id).await?;
    Ok(Json(AverageRating { average_rating }))
}

/// Handler listing the caller's own reviews
pub async fn for_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Vec<UserReview>>> {
    Ok(Json(state.reviews.reviews_by_user(user.id).await?))
}

/// Handler for editing one of the caller's reviews
pub async fn update(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(review_id): Path<i64>,
    Json(update): Json<ReviewUpdate>,
) -> AppResult<Json<MessageResponse>> {
    update.validate()?;

    if !state
        .reviews
        .update_review(user.id, review_id, &update)
        .await?
    {
        return Err(review_not_found());
    }

    tracing::info!(user_id = %user.id, review_id, "Review updated");

    Ok(Json(MessageResponse::new("Review updated")))
}

/// Handler for deleting one of the caller's reviews
pub async fn delete(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(review_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    if !state.reviews.delete_review(user.id, review_id).await? {
        return Err(review_not_found());
    }

    tracing::info!(user_id = %user.id, review_id, "Review deleted");

    Ok(Json(MessageResponse::new("Review deleted")))
}
