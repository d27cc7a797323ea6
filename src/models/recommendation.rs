use serde::Serialize;

use super::Title;

/// A recommended title with the scores used to rank it
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationItem {
    #[serde(flatten)]
    pub title: Title,
    /// Mean rating across all reviewers, 0 when unrated
    pub avg_rating: f64,
    /// Number of the title's genres found in the user's preference set
    pub genre_match_score: usize,
}
