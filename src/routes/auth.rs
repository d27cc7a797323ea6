use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{AuthResponse, LoginRequest, RegisterRequest, UserProfile},
    routes::AppState,
    services::auth,
};

/// Handler for account registration
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response = auth::register(
        state.users.as_ref(),
        &state.hasher,
        &state.tokens,
        request,
    )
    .await?;
    Ok(Json(response))
}

/// Handler for password login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response =
        auth::login(state.users.as_ref(), &state.hasher, &state.tokens, request).await?;
    Ok(Json(response))
}

/// Handler returning the caller's profile
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<UserProfile>> {
    state
        .users
        .find_by_id(user.id)
        .await?
        .map(|u| Json(UserProfile::from(&u)))
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
