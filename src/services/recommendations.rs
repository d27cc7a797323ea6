use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::{CatalogStore, FavoriteStore, ReviewStore},
    error::AppResult,
    models::{Favorite, GenreList, RecommendationItem, Title, UserReview},
};

/// Reviews rated at or above this count as a genre preference
pub const HIGH_RATING_THRESHOLD: i32 = 4;

/// Maximum number of recommendations returned per request
pub const RECOMMENDATION_LIMIT: usize = 10;

/// Genre labels a user is implicitly interested in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceSet(HashSet<String>);

impl PreferenceSet {
    pub fn contains(&self, genre: &str) -> bool {
        self.0.contains(genre)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct labels of `genres` present in the set
    pub fn match_count(&self, genres: &GenreList) -> usize {
        genres
            .distinct()
            .into_iter()
            .filter(|genre| self.contains(genre))
            .count()
    }
}

impl<S: Into<String>> FromIterator<S> for PreferenceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Titles a user has already interacted with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interactions {
    pub favorited: HashSet<String>,
    pub reviewed: HashSet<String>,
    /// Subset of `reviewed` with a rating at or above the threshold
    pub highly_rated: HashSet<String>,
}

impl Interactions {
    pub fn from_history(favorites: &[Favorite], reviews: &[UserReview], threshold: i32) -> Self {
        Self {
            favorited: favorites.iter().map(|f| f.show_id.clone()).collect(),
            reviewed: reviews.iter().map(|r| r.review.show_id.clone()).collect(),
            highly_rated: reviews
                .iter()
                .filter(|r| r.review.rating >= threshold)
                .map(|r| r.review.show_id.clone())
                .collect(),
        }
    }

    /// Whether any interaction can contribute genres
    pub fn has_preference_sources(&self) -> bool {
        !self.favorited.is_empty() || !self.highly_rated.is_empty()
    }

    /// Favorited or reviewed titles are never recommended
    pub fn excludes(&self, show_id: &str) -> bool {
        self.favorited.contains(show_id) || self.reviewed.contains(show_id)
    }
}

/// A catalog title with its ranking keys
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub title: &'a Title,
    pub genre_match_score: usize,
    pub avg_rating: f64,
}

impl ScoredCandidate<'_> {
    fn into_item(self) -> RecommendationItem {
        RecommendationItem {
            title: self.title.clone(),
            avg_rating: self.avg_rating,
            genre_match_score: self.genre_match_score,
        }
    }
}

/// Unions the genres of favorited and highly rated titles
pub fn extract_preferences(catalog: &[Title], interactions: &Interactions) -> PreferenceSet {
    catalog
        .iter()
        .filter(|title| {
            interactions.favorited.contains(&title.show_id)
                || interactions.highly_rated.contains(&title.show_id)
        })
        .flat_map(|title| title.genres.iter())
        .collect()
}

/// Scores every title the user has not interacted with
///
/// `averages` holds the mean rating across all reviewers; titles missing from
/// it are unrated and score 0.
pub fn score_candidates<'a>(
    catalog: &'a [Title],
    preferences: &PreferenceSet,
    interactions: &Interactions,
    averages: &HashMap<String, f64>,
) -> Vec<ScoredCandidate<'a>> {
    catalog
        .iter()
        .filter(|title| !interactions.excludes(&title.show_id))
        .map(|title| ScoredCandidate {
            title,
            genre_match_score: preferences.match_count(&title.genres),
            avg_rating: averages.get(&title.show_id).copied().unwrap_or(0.0),
        })
        .collect()
}

/// Keeps positive scores, orders by genre match then average rating, truncates
///
/// Remaining ties are broken by show id so results are reproducible.
pub fn rank(candidates: Vec<ScoredCandidate<'_>>, limit: usize) -> Vec<RecommendationItem> {
    let mut ranked: Vec<ScoredCandidate<'_>> = candidates
        .into_iter()
        .filter(|candidate| candidate.genre_match_score > 0)
        .collect();

    ranked.sort_by(|a, b| {
        b.genre_match_score
            .cmp(&a.genre_match_score)
            .then_with(|| b.avg_rating.total_cmp(&a.avg_rating))
            .then_with(|| a.title.show_id.cmp(&b.title.show_id))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(ScoredCandidate::into_item)
        .collect()
}

/// Genre-overlap recommender
///
/// Recomputed on every call from the current favorites, reviews and catalog;
/// nothing is cached between requests.
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<dyn CatalogStore>,
    reviews: Arc<dyn ReviewStore>,
    favorites: Arc<dyn FavoriteStore>,
}

impl Recommender {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        reviews: Arc<dyn ReviewStore>,
        favorites: Arc<dyn FavoriteStore>,
    ) -> Self {
        Self {
            catalog,
            reviews,
            favorites,
        }
    }

    /// Returns up to [`RECOMMENDATION_LIMIT`] titles for the user
    ///
    /// Any storage failure fails the whole call; an unknown user or one without
    /// favorites or high ratings gets an empty list.
    #[instrument(skip(self))]
    pub async fn recommend(&self, user_id: Uuid) -> AppResult<Vec<RecommendationItem>> {
        let (favorites, reviews) = tokio::try_join!(
            self.favorites.favorites_by_user(user_id),
            self.reviews.reviews_by_user(user_id),
        )?;

        let interactions = Interactions::from_history(&favorites, &reviews, HIGH_RATING_THRESHOLD);
        if !interactions.has_preference_sources() {
            tracing::debug!(user_id = %user_id, "No favorites or high ratings");
            return Ok(Vec::new());
        }

        let (catalog, averages) =
            tokio::try_join!(self.catalog.all_titles(), self.reviews.average_ratings())?;

        let preferences = extract_preferences(&catalog, &interactions);
        if preferences.is_empty() {
            tracing::debug!(user_id = %user_id, "Interacted titles carry no genres");
            return Ok(Vec::new());
        }

        let candidates = score_candidates(&catalog, &preferences, &interactions, &averages);
        let candidate_count = candidates.len();
        let recommendations = rank(candidates, RECOMMENDATION_LIMIT);

        tracing::info!(
            user_id = %user_id,
            preferred_genres = preferences.len(),
            candidates = candidate_count,
            returned = recommendations.len(),
            "Computed recommendations"
        );

        Ok(recommendations)
    }
}
