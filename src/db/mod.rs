//! Storage abstraction
//!
//! Handlers and the recommender only see these traits, so the same code runs
//! against PostgreSQL in production and the in-memory store in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Favorite, NewReview, RatedTitle, Review, ReviewUpdate, Title, TitleFilter, TitlePage, User,
        UserReview,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};

/// Read-only access to the static catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Filtered, sorted, paginated listing
    async fn list_titles(&self, filter: &TitleFilter) -> AppResult<TitlePage>;

    async fn get_title(&self, show_id: &str) -> AppResult<Option<Title>>;

    /// Full scan with parsed genre lists
    async fn all_titles(&self) -> AppResult<Vec<Title>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Inserts a review and returns its id
    async fn create_review(&self, user_id: Uuid, review: &NewReview) -> AppResult<i64>;

    /// Reviews of a title, newest first
    async fn reviews_for_title(&self, show_id: &str) -> AppResult<Vec<Review>>;

    /// A user's own reviews with title names, newest first
    async fn reviews_by_user(&self, user_id: Uuid) -> AppResult<Vec<UserReview>>;

    /// Mean rating of one title, 0 when unrated
    async fn average_rating(&self, show_id: &str) -> AppResult<f64>;

    /// Mean rating of every reviewed title, keyed by show id
    async fn average_ratings(&self) -> AppResult<HashMap<String, f64>>;

    /// Returns false when no review with this id belongs to the user
    async fn update_review(
        &self,
        user_id: Uuid,
        review_id: i64,
        update: &ReviewUpdate,
    ) -> AppResult<bool>;

    /// Returns false when no review with this id belongs to the user
    async fn delete_review(&self, user_id: Uuid, review_id: i64) -> AppResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Inserts a favorite; a duplicate (user, title) pair yields `AppError::Conflict`
    async fn add_favorite(&self, user_id: Uuid, show_id: &str) -> AppResult<i64>;

    async fn favorites_by_user(&self, user_id: Uuid) -> AppResult<Vec<Favorite>>;

    /// Favorited titles with their average rating, newest favorite first
    async fn favorite_titles(&self, user_id: Uuid) -> AppResult<Vec<RatedTitle>>;

    /// Returns false when the title was not favorited
    async fn remove_favorite(&self, user_id: Uuid, show_id: &str) -> AppResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates an account; a taken email yields `AppError::Conflict`
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<User>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
}

/// Mean of integer ratings, 0 for an empty slice
pub fn mean_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_rating() {
        assert_eq!(mean_rating(&[]), 0.0);
        assert_eq!(mean_rating(&[5, 3]), 4.0);
        assert!((mean_rating(&[5, 4, 4]) - 4.333).abs() < 0.001);
    }
}
