use axum::{
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::{CatalogStore, FavoriteStore, ReviewStore, UserStore},
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{PasswordHasher, Recommender, TokenManager},
};

pub mod auth;
pub mod favorites;
pub mod recommendations;
pub mod reviews;
pub mod titles;

/// Shared application state
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub users: Arc<dyn UserStore>,
    pub recommender: Recommender,
    pub tokens: TokenManager,
    pub hasher: PasswordHasher,
}

impl AppState {
    /// Wires every handler and the recommender to one backing store
    pub fn new<S>(store: Arc<S>, tokens: TokenManager) -> Self
    where
        S: CatalogStore + ReviewStore + FavoriteStore + UserStore + 'static,
    {
        let catalog: Arc<dyn CatalogStore> = store.clone();
        let reviews: Arc<dyn ReviewStore> = store.clone();
        let favorites: Arc<dyn FavoriteStore> = store.clone();

        Self {
            recommender: Recommender::new(catalog.clone(), reviews.clone(), favorites.clone()),
            catalog,
            reviews,
            favorites,
            users: store,
            tokens,
            hasher: PasswordHasher::new(),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/titles", get(titles::list))
        .route("/titles/:id", get(titles::get))
        // Reviews; `/reviews/user` takes precedence over the `:id` segment
        .route("/reviews", post(reviews::create))
        .route("/reviews/user", get(reviews::for_user))
        .route(
            "/reviews/:id",
            get(reviews::for_title)
                .put(reviews::update)
                .delete(reviews::delete),
        )
        .route("/reviews/:id/average", get(reviews::average))
        // Favorites
        .route("/favorites", get(favorites::list).post(favorites::add))
        .route("/favorites/:id", delete(favorites::remove))
        // Recommendations
        .route("/recommendations", get(recommendations::recommend))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
