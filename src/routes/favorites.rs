use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{CreatedResponse, MessageResponse, NewFavorite, RatedTitle},
    routes::AppState,
};

/// Handler for adding a title to the caller's favorites
pub async fn add(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<NewFavorite>,
) -> AppResult<Json<CreatedResponse>> {
    if state.catalog.get_title(&request.show_id).await?.is_none() {
        return Err(AppError::NotFound("Title not found".to_string()));
    }

    let id = state.favorites.add_favorite(user.id, &request.show_id).await?;

    tracing::info!(user_id = %user.id, show_id = %request.show_id, "Favorite added");

    Ok(Json(CreatedResponse { id }))
}

/// Handler listing the caller's favorited titles
pub async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Vec<RatedTitle>>> {
    Ok(Json(state.favorites.favorite_titles(user.id).await?))
}

/// Handler for removing a title from the caller's favorites
pub async fn remove(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(show_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    if !state.favorites.remove_favorite(user.id, &show_id).await? {
        return Err(AppError::NotFound("Favorite not found".to_string()));
    }

    tracing::info!(user_id = %user.id, show_id = %show_id, "Favorite removed");

    Ok(Json(MessageResponse::new("Removed from favorites")))
}
