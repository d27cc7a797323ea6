use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

use super::{CatalogStore, FavoriteStore, ReviewStore, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        Favorite, NewReview, Pagination, RatedTitle, Review, ReviewUpdate, Title, TitleFilter,
        TitlePage, TitleRow, User, UserReview,
    },
};

const TITLE_COLUMNS: &str = r#"show_id, type, title, director, "cast", country, date_added,
    release_year, rating, duration, listed_in, description"#;

const PREFIXED_TITLE_COLUMNS: &str = r#"t.show_id, t.type, t.title, t.director, t."cast",
    t.country, t.date_added, t.release_year, t.rating, t.duration, t.listed_in, t.description"#;

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL-backed implementation of every storage trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Builds a case-insensitive substring pattern, with LIKE wildcards in the
/// input matched literally
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Appends the listing WHERE clauses shared by the count and page queries
fn push_title_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TitleFilter) {
    if let Some(search) = &filter.search {
        let pattern = contains_pattern(search);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(director) = &filter.director {
        builder
            .push(" AND director ILIKE ")
            .push_bind(contains_pattern(director));
    }

    if let Some(rating) = &filter.rating {
        builder.push(" AND rating = ").push_bind(rating.clone());
    }
}

/// Names the missing parent row from the violated foreign key
fn foreign_key_error(constraint: Option<&str>) -> AppError {
    match constraint {
        Some(name) if name.ends_with("_user_id_fkey") => {
            AppError::Unauthorized("User not found".to_string())
        }
        _ => AppError::NotFound("Title not found".to_string()),
    }
}

/// Maps constraint violations on insert to distinct errors
fn map_insert_error(e: sqlx::Error, conflict: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(conflict.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return foreign_key_error(db_err.constraint());
        }
    }
    AppError::Database(e)
}

#[async_trait]
impl CatalogStore for PgStore {
    #[instrument(skip(self))]
    async fn list_titles(&self, filter: &TitleFilter) -> AppResult<TitlePage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM titles WHERE 1=1");
        push_title_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM titles WHERE 1=1", TITLE_COLUMNS));
        push_title_filters(&mut query, filter);
        // Column and direction come from whitelisted enums, never from raw input
        query.push(format!(
            " ORDER BY {} {}, show_id ASC",
            filter.sort_by.as_sql(),
            filter.sort_order.as_sql()
        ));
        query
            .push(" LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows: Vec<TitleRow> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(TitlePage {
            titles: rows.into_iter().map(Title::from).collect(),
            pagination: Pagination::new(total, filter.page, filter.limit),
        })
    }

    async fn get_title(&self, show_id: &str) -> AppResult<Option<Title>> {
        let row = sqlx::query_as::<_, TitleRow>(&format!(
            "SELECT {} FROM titles WHERE show_id = $1",
            TITLE_COLUMNS
        ))
        .bind(show_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Title::from))
    }

    #[instrument(skip(self))]
    async fn all_titles(&self) -> AppResult<Vec<Title>> {
        let rows = sqlx::query_as::<_, TitleRow>(&format!("SELECT {} FROM titles", TITLE_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(count = rows.len(), "Loaded catalog");

        Ok(rows.into_iter().map(Title::from).collect())
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn create_review(&self, user_id: Uuid, review: &NewReview) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO reviews (show_id, user_id, rating, review)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&review.show_id)
        .bind(user_id)
        .bind(review.rating)
        .bind(&review.review)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "Duplicate review"))
    }

    async fn reviews_for_title(&self, show_id: &str) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, show_id, user_id, rating, review, created_at
            FROM reviews
            WHERE show_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(show_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn reviews_by_user(&self, user_id: Uuid) -> AppResult<Vec<UserReview>> {
        let reviews = sqlx::query_as::<_, UserReview>(
            r#"
            SELECT r.id, r.show_id, r.user_id, r.rating, r.review, r.created_at, t.title
            FROM reviews r
            JOIN titles t ON t.show_id = r.show_id
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn average_rating(&self, show_id: &str) -> AppResult<f64> {
        let average = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(AVG(rating)::float8, 0) FROM reviews WHERE show_id = $1",
        )
        .bind(show_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(average)
    }

    async fn average_ratings(&self) -> AppResult<HashMap<String, f64>> {
        let rows = sqlx::query_as::<_, (String, f64)>(
            "SELECT show_id, AVG(rating)::float8 FROM reviews GROUP BY show_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn update_review(
        &self,
        user_id: Uuid,
        review_id: i64,
        update: &ReviewUpdate,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE reviews SET rating = $1, review = $2 WHERE id = $3 AND user_id = $4",
        )
        .bind(update.rating)
        .bind(&update.review)
        .bind(review_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_review(&self, user_id: Uuid, review_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
            .bind(review_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(sqlx::FromRow)]
struct RatedTitleRow {
    #[sqlx(flatten)]
    title: TitleRow,
    avg_rating: f64,
}

#[async_trait]
impl FavoriteStore for PgStore {
    async fn add_favorite(&self, user_id: Uuid, show_id: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO favorites (show_id, user_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(show_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "Title already in favorites"))
    }

    async fn favorites_by_user(&self, user_id: Uuid) -> AppResult<Vec<Favorite>> {
        let favorites = sqlx::query_as::<_, Favorite>(
            r#"
            SELECT id, show_id, user_id, created_at
            FROM favorites
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(favorites)
    }

    async fn favorite_titles(&self, user_id: Uuid) -> AppResult<Vec<RatedTitle>> {
        let rows = sqlx::query_as::<_, RatedTitleRow>(&format!(
            r#"
            SELECT {}, COALESCE(a.avg_rating, 0) AS avg_rating
            FROM favorites f
            JOIN titles t ON t.show_id = f.show_id
            LEFT JOIN (
                SELECT show_id, AVG(rating)::float8 AS avg_rating
                FROM reviews
                GROUP BY show_id
            ) a ON a.show_id = t.show_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC, f.id DESC
            "#,
            PREFIXED_TITLE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RatedTitle {
                title: row.title.into(),
                avg_rating: row.avg_rating,
            })
            .collect())
    }

    async fn remove_favorite(&self, user_id: Uuid, show_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND show_id = $2")
            .bind(user_id)
            .bind(show_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "Email already registered"))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
