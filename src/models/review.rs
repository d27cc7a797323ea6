use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// A user's rating and comment on a title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub show_id: String,
    pub user_id: Uuid,
    pub rating: i32,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

/// A review joined with the reviewed title's display name
#[derive(Debug, Clone, Serialize, PartialEq, sqlx::FromRow)]
pub struct UserReview {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub review: Review,
    pub title: String,
}

/// Body of `POST /api/reviews`
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub show_id: String,
    pub rating: i32,
    #[serde(default)]
    pub review: String,
}

impl NewReview {
    pub fn validate(&self) -> AppResult<()> {
        if self.show_id.trim().is_empty() {
            return Err(AppError::InvalidInput("show_id is required".to_string()));
        }
        validate_rating(self.rating)
    }
}

/// Body of `PUT /api/reviews/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewUpdate {
    pub rating: i32,
    #[serde(default)]
    pub review: String,
}

impl ReviewUpdate {
    pub fn validate(&self) -> AppResult<()> {
        validate_rating(self.rating)
    }
}

fn validate_rating(rating: i32) -> AppResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::InvalidInput(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AverageRating {
    pub average_rating: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        let mut review = NewReview {
            show_id: "s1".to_string(),
            rating: 5,
            review: "Great movie!".to_string(),
        };
        assert!(review.validate().is_ok());

        review.rating = 0;
        assert!(matches!(review.validate(), Err(AppError::InvalidInput(_))));

        review.rating = 6;
        assert!(matches!(review.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_missing_show_id() {
        let review = NewReview {
            show_id: " ".to_string(),
            rating: 3,
            review: String::new(),
        };
        assert!(review.validate().is_err());
    }

    #[test]
    fn test_user_review_flattens() {
        let review = UserReview {
            review: Review {
                id: 7,
                show_id: "s1".to_string(),
                user_id: Uuid::new_v4(),
                rating: 4,
                review: "Solid".to_string(),
                created_at: Utc::now(),
            },
            title: "Test Movie".to_string(),
        };

        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["rating"], 4);
        assert_eq!(json["title"], "Test Movie");
    }
}
