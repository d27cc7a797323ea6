use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::{AuthUser, RequestId},
    models::RecommendationItem,
    routes::AppState,
};

/// Handler for the caller's genre-overlap recommendations
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    user: AuthUser,
) -> AppResult<Json<Vec<RecommendationItem>>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %user.id,
        "Processing recommendation request"
    );

    let recommendations = state.recommender.recommend(user.id).await?;

    Ok(Json(recommendations))
}
