use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Title;

/// A title bookmarked by a user; unique per (user, title)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Favorite {
    pub id: i64,
    pub show_id: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/favorites`
#[derive(Debug, Clone, Deserialize)]
pub struct NewFavorite {
    pub show_id: String,
}

/// A title together with its average rating across all reviewers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatedTitle {
    #[serde(flatten)]
    pub title: Title,
    pub avg_rating: f64,
}
