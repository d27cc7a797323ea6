use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Title, TitleFilter, TitlePage, TitleQuery},
    routes::AppState,
};

/// Handler for the paginated catalog listing
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TitleQuery>,
) -> AppResult<Json<TitlePage>> {
    let filter = TitleFilter::try_from(query)?;
    let page = state.catalog.list_titles(&filter).await?;

    tracing::debug!(
        total = page.pagination.total,
        page = filter.page,
        returned = page.titles.len(),
        "Listed titles"
    );

    Ok(Json(page))
}

/// Handler for a single title
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<String>,
) -> AppResult<Json<Title>> {
    state
        .catalog
        .get_title(&show_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Title not found".to_string()))
}
