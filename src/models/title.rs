use serde::{Deserialize, Serialize, Serializer};
use std::{cmp::Ordering, collections::HashSet, fmt::Display};

use crate::error::AppError;

/// Separator between genre labels in the catalog's `listed_in` column
pub const GENRE_DELIMITER: &str = ", ";

/// Kind of catalog entry, serialized with the catalog's own spelling
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum TitleType {
    #[serde(rename = "Movie")]
    Movie,
    #[serde(rename = "TV Show")]
    Series,
}

impl TitleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleType::Movie => "Movie",
            TitleType::Series => "TV Show",
        }
    }
}

impl From<&str> for TitleType {
    fn from(raw: &str) -> Self {
        match raw {
            "TV Show" | "series" | "Series" => TitleType::Series,
            _ => TitleType::Movie,
        }
    }
}

/// Ordered genre labels of a title
///
/// Parsed once from the delimited catalog column when a title is materialized.
/// Labels are trimmed and compared as exact, case-sensitive strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreList(Vec<String>);

impl GenreList {
    /// Splits a `listed_in` value such as `"Dramas, International Movies"`
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(GENRE_DELIMITER)
                .map(str::trim)
                .filter(|genre| !genre.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Labels with duplicates removed
    pub fn distinct(&self) -> HashSet<&str> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for GenreList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(GENRE_DELIMITER))
    }
}

impl<S: Into<String>> FromIterator<S> for GenreList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for GenreList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A movie or TV show from the static catalog
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Title {
    pub show_id: String,
    #[serde(rename = "type")]
    pub title_type: TitleType,
    pub title: String,
    pub director: Option<String>,
    pub cast: Option<String>,
    pub country: Option<String>,
    pub date_added: Option<String>,
    pub release_year: Option<i32>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    #[serde(rename = "listed_in")]
    pub genres: GenreList,
    pub description: Option<String>,
}

impl Title {
    /// Creates a title with only the required fields set
    pub fn new(show_id: impl Into<String>, title: impl Into<String>, title_type: TitleType) -> Self {
        Self {
            show_id: show_id.into(),
            title_type,
            title: title.into(),
            director: None,
            cast: None,
            country: None,
            date_added: None,
            release_year: None,
            rating: None,
            duration: None,
            genres: GenreList::default(),
            description: None,
        }
    }

    pub fn with_genres(mut self, listed_in: &str) -> Self {
        self.genres = GenreList::parse(listed_in);
        self
    }

    pub fn with_director(mut self, director: impl Into<String>) -> Self {
        self.director = Some(director.into());
        self
    }

    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    pub fn with_release_year(mut self, year: i32) -> Self {
        self.release_year = Some(year);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Applies the listing filters (case-insensitive substring for search and director)
    pub fn matches(&self, filter: &TitleFilter) -> bool {
        let contains = |field: Option<&str>, needle: &str| -> bool {
            field
                .map(|value| value.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false)
        };

        if let Some(search) = &filter.search {
            if !contains(Some(self.title.as_str()), search)
                && !contains(self.description.as_deref(), search)
            {
                return false;
            }
        }

        if let Some(director) = &filter.director {
            if !contains(self.director.as_deref(), director) {
                return false;
            }
        }

        if let Some(rating) = &filter.rating {
            if self.rating.as_deref() != Some(rating.as_str()) {
                return false;
            }
        }

        true
    }

    /// Compares two titles on a sort column, NULLs last for ascending order
    pub fn compare_by(&self, other: &Title, column: SortColumn) -> Ordering {
        fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
            match (a, b) {
                (Some(a), Some(b)) => a.cmp(&b),
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
            }
        }

        match column {
            SortColumn::ShowId => self.show_id.cmp(&other.show_id),
            SortColumn::Title => self.title.cmp(&other.title),
            SortColumn::TitleType => self.title_type.as_str().cmp(other.title_type.as_str()),
            SortColumn::ReleaseYear => nulls_last(self.release_year, other.release_year),
            SortColumn::DateAdded => nulls_last(self.date_added.as_ref(), other.date_added.as_ref()),
            SortColumn::Director => nulls_last(self.director.as_ref(), other.director.as_ref()),
            SortColumn::Rating => nulls_last(self.rating.as_ref(), other.rating.as_ref()),
        }
    }
}

/// Raw `titles` row as stored in PostgreSQL
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TitleRow {
    pub show_id: String,
    #[sqlx(rename = "type")]
    pub title_type: String,
    pub title: String,
    pub director: Option<String>,
    pub cast: Option<String>,
    pub country: Option<String>,
    pub date_added: Option<String>,
    pub release_year: Option<i32>,
    pub rating: Option<String>,
    pub duration: Option<String>,
    pub listed_in: Option<String>,
    pub description: Option<String>,
}

impl From<TitleRow> for Title {
    fn from(row: TitleRow) -> Self {
        Title {
            show_id: row.show_id,
            title_type: TitleType::from(row.title_type.as_str()),
            title: row.title,
            director: row.director,
            cast: row.cast,
            country: row.country,
            date_added: row.date_added,
            release_year: row.release_year,
            rating: row.rating,
            duration: row.duration,
            genres: row
                .listed_in
                .as_deref()
                .map(GenreList::parse)
                .unwrap_or_default(),
            description: row.description,
        }
    }
}

// ============================================================================
// Listing
// ============================================================================

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query string accepted by `GET /api/titles`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleQuery {
    pub search: Option<String>,
    pub director: Option<String>,
    pub rating: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Whitelisted sort columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    ShowId,
    Title,
    TitleType,
    ReleaseYear,
    DateAdded,
    Director,
    Rating,
}

impl SortColumn {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::ShowId => "show_id",
            SortColumn::Title => "title",
            SortColumn::TitleType => "type",
            SortColumn::ReleaseYear => "release_year",
            SortColumn::DateAdded => "date_added",
            SortColumn::Director => "director",
            SortColumn::Rating => "rating",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "show_id" => Some(SortColumn::ShowId),
            "title" => Some(SortColumn::Title),
            "type" => Some(SortColumn::TitleType),
            "release_year" => Some(SortColumn::ReleaseYear),
            "date_added" => Some(SortColumn::DateAdded),
            "director" => Some(SortColumn::Director),
            "rating" => Some(SortColumn::Rating),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Validated form of [`TitleQuery`]
#[derive(Debug, Clone, PartialEq)]
pub struct TitleFilter {
    pub search: Option<String>,
    pub director: Option<String>,
    pub rating: Option<String>,
    pub sort_by: SortColumn,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for TitleFilter {
    fn default() -> Self {
        Self {
            search: None,
            director: None,
            rating: None,
            sort_by: SortColumn::ShowId,
            sort_order: SortOrder::Asc,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TitleFilter {
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl TryFrom<TitleQuery> for TitleFilter {
    type Error = AppError;

    fn try_from(query: TitleQuery) -> Result<Self, Self::Error> {
        // Browsers send empty strings for unset inputs
        let non_empty = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let sort_by = match non_empty(query.sort_by) {
            Some(raw) => SortColumn::parse(&raw)
                .ok_or_else(|| AppError::InvalidInput(format!("Cannot sort by '{}'", raw)))?,
            None => SortColumn::ShowId,
        };

        let sort_order = match non_empty(query.sort_order) {
            Some(raw) => match raw.to_lowercase().as_str() {
                "asc" => SortOrder::Asc,
                "desc" => SortOrder::Desc,
                _ => {
                    return Err(AppError::InvalidInput(format!(
                        "Invalid sort order '{}'",
                        raw
                    )))
                }
            },
            None => SortOrder::Asc,
        };

        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(Self {
            search: non_empty(query.search),
            director: non_empty(query.director),
            rating: non_empty(query.rating),
            sort_by,
            sort_order,
            page: query.page.unwrap_or(1).max(1),
            limit,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pagination {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: u32, limit: u32) -> Self {
        let limit_i64 = i64::from(limit.max(1));
        Self {
            total,
            page,
            limit,
            total_pages: (total + limit_i64 - 1) / limit_i64,
        }
    }
}

/// One page of catalog results
#[derive(Debug, Clone, Serialize)]
pub struct TitlePage {
    pub titles: Vec<Title>,
    pub pagination: Pagination,
}
