use serde::{Deserialize, Serialize};

mod favorite;
mod recommendation;
mod review;
mod title;
mod user;

pub use favorite::{Favorite, NewFavorite, RatedTitle};
pub use recommendation::RecommendationItem;
pub use review::{AverageRating, NewReview, Review, ReviewUpdate, UserReview, MAX_RATING, MIN_RATING};
pub use title::{
    GenreList, Pagination, SortColumn, SortOrder, Title, TitleFilter, TitlePage, TitleQuery,
    TitleRow, TitleType, GENRE_DELIMITER,
};
pub use user::{AuthResponse, LoginRequest, RegisterRequest, User, UserProfile};

/// Response carrying the id of a newly created row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
