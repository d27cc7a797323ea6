use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{mean_rating, CatalogStore, FavoriteStore, ReviewStore, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        Favorite, NewReview, Pagination, RatedTitle, Review, ReviewUpdate, Title, TitleFilter,
        TitlePage, User, UserReview,
    },
};

/// In-memory store with the same observable semantics as [`super::PgStore`]
///
/// Used by the HTTP tests and for running the API without a database.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    titles: BTreeMap<String, Title>,
    users: HashMap<Uuid, User>,
    reviews: Vec<Review>,
    favorites: Vec<Favorite>,
    next_review_id: i64,
    next_favorite_id: i64,
}

impl MemoryStoreInner {
    fn ratings_for(&self, show_id: &str) -> Vec<i32> {
        self.reviews
            .iter()
            .filter(|r| r.show_id == show_id)
            .map(|r| r.rating)
            .collect()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a catalog
    pub fn with_titles(titles: impl IntoIterator<Item = Title>) -> Self {
        let mut inner = MemoryStoreInner::default();
        for title in titles {
            inner.titles.insert(title.show_id.clone(), title);
        }
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }
}

/// Newest first, matching `ORDER BY created_at DESC, id DESC`
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_titles(&self, filter: &TitleFilter) -> AppResult<TitlePage> {
        let inner = self.inner.read().await;

        let mut matching: Vec<&Title> = inner
            .titles
            .values()
            .filter(|title| title.matches(filter))
            .collect();

        matching.sort_by(|a, b| {
            let ordering = a.compare_by(b, filter.sort_by);
            let ordering = match filter.sort_order {
                crate::models::SortOrder::Asc => ordering,
                crate::models::SortOrder::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.show_id.cmp(&b.show_id))
        });

        let total = matching.len() as i64;
        let titles = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();

        Ok(TitlePage {
            titles,
            pagination: Pagination::new(total, filter.page, filter.limit),
        })
    }

    async fn get_title(&self, show_id: &str) -> AppResult<Option<Title>> {
        Ok(self.inner.read().await.titles.get(show_id).cloned())
    }

    async fn all_titles(&self) -> AppResult<Vec<Title>> {
        Ok(self.inner.read().await.titles.values().cloned().collect())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn create_review(&self, user_id: Uuid, review: &NewReview) -> AppResult<i64> {
        let mut inner = self.inner.write().await;
        if !inner.titles.contains_key(&review.show_id) {
            return Err(AppError::NotFound("Title not found".to_string()));
        }

        inner.next_review_id += 1;
        let id = inner.next_review_id;
        inner.reviews.push(Review {
            id,
            show_id: review.show_id.clone(),
            user_id,
            rating: review.rating,
            review: review.review.clone(),
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn reviews_for_title(&self, show_id: &str) -> AppResult<Vec<Review>> {
        let inner = self.inner.read().await;
        let mut reviews: Vec<Review> = inner
            .reviews
            .iter()
            .filter(|r| r.show_id == show_id)
            .cloned()
            .collect();
        newest_first(&mut reviews, |r| (r.created_at, r.id));
        Ok(reviews)
    }

    async fn reviews_by_user(&self, user_id: Uuid) -> AppResult<Vec<UserReview>> {
        let inner = self.inner.read().await;
        let mut reviews: Vec<UserReview> = inner
            .reviews
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                inner.titles.get(&r.show_id).map(|title| UserReview {
                    review: r.clone(),
                    title: title.title.clone(),
                })
            })
            .collect();
        newest_first(&mut reviews, |r| (r.review.created_at, r.review.id));
        Ok(reviews)
    }

    async fn average_rating(&self, show_id: &str) -> AppResult<f64> {
        let inner = self.inner.read().await;
        Ok(mean_rating(&inner.ratings_for(show_id)))
    }

    async fn average_ratings(&self) -> AppResult<HashMap<String, f64>> {
        let inner = self.inner.read().await;
        let mut grouped: HashMap<String, Vec<i32>> = HashMap::new();
        for review in &inner.reviews {
            grouped
                .entry(review.show_id.clone())
                .or_default()
                .push(review.rating);
        }

        Ok(grouped
            .into_iter()
            .map(|(show_id, ratings)| (show_id, mean_rating(&ratings)))
            .collect())
    }

    async fn update_review(
        &self,
        user_id: Uuid,
        review_id: i64,
        update: &ReviewUpdate,
    ) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id && r.user_id == user_id)
        {
            Some(review) => {
                review.rating = update.rating;
                review.review = update.review.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_review(&self, user_id: Uuid, review_id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.reviews.len();
        inner
            .reviews
            .retain(|r| !(r.id == review_id && r.user_id == user_id));
        Ok(inner.reviews.len() < before)
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn add_favorite(&self, user_id: Uuid, show_id: &str) -> AppResult<i64> {
        let mut inner = self.inner.write().await;
        if !inner.titles.contains_key(show_id) {
            return Err(AppError::NotFound("Title not found".to_string()));
        }
        if inner
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.show_id == show_id)
        {
            return Err(AppError::Conflict("Title already in favorites".to_string()));
        }

        inner.next_favorite_id += 1;
        let id = inner.next_favorite_id;
        inner.favorites.push(Favorite {
            id,
            show_id: show_id.to_string(),
            user_id,
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn favorites_by_user(&self, user_id: Uuid) -> AppResult<Vec<Favorite>> {
        let inner = self.inner.read().await;
        let mut favorites: Vec<Favorite> = inner
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut favorites, |f| (f.created_at, f.id));
        Ok(favorites)
    }

    async fn favorite_titles(&self, user_id: Uuid) -> AppResult<Vec<RatedTitle>> {
        let favorites = self.favorites_by_user(user_id).await?;
        let inner = self.inner.read().await;

        Ok(favorites
            .iter()
            .filter_map(|favorite| {
                inner.titles.get(&favorite.show_id).map(|title| RatedTitle {
                    title: title.clone(),
                    avg_rating: mean_rating(&inner.ratings_for(&favorite.show_id)),
                })
            })
            .collect())
    }

    async fn remove_favorite(&self, user_id: Uuid, show_id: &str) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.favorites.len();
        inner
            .favorites
            .retain(|f| !(f.user_id == user_id && f.show_id == show_id));
        Ok(inner.favorites.len() < before)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }
}
