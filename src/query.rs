//! Catalog query planning.
//!
//! Read paths never splice request text into SQL. A request is resolved into a closed
//! `SortDirective` and a `MovieFilter`, and `MovieQuery::query_builder` turns those into one
//! of a handful of fixed statement shapes where the only user-derived value is a bound
//! parameter.

use std::{cmp::Ordering, fmt, str::FromStr};

use sqlx::{Postgres, QueryBuilder};

use crate::{error::ValidationError, models::MovieSummary};

const MOVIE_COLUMNS: &str = "m.id, m.name, m.description, m.release_date, m.rating";

/// SortDirective
///
/// The six accepted orderings. Every ordering ends with `m.id ASC` so equal keys come back
/// in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirective {
    NameAsc,
    NameDesc,
    RatingAsc,
    #[default]
    RatingDesc,
    DateAsc,
    DateDesc,
}

impl SortDirective {
    pub const ALL: [SortDirective; 6] = [
        SortDirective::NameAsc,
        SortDirective::NameDesc,
        SortDirective::RatingAsc,
        SortDirective::RatingDesc,
        SortDirective::DateAsc,
        SortDirective::DateDesc,
    ];

    /// The wire token, e.g. `rating_desc`.
    pub fn token(&self) -> &'static str {
        match self {
            SortDirective::NameAsc => "name_asc",
            SortDirective::NameDesc => "name_desc",
            SortDirective::RatingAsc => "rating_asc",
            SortDirective::RatingDesc => "rating_desc",
            SortDirective::DateAsc => "date_asc",
            SortDirective::DateDesc => "date_desc",
        }
    }

    /// Exact, case-sensitive match against the six tokens.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.token() == raw)
    }

    fn order_by(&self) -> &'static str {
        match self {
            SortDirective::NameAsc => " ORDER BY m.name ASC, m.id ASC",
            SortDirective::NameDesc => " ORDER BY m.name DESC, m.id ASC",
            SortDirective::RatingAsc => " ORDER BY m.rating ASC, m.id ASC",
            SortDirective::RatingDesc => " ORDER BY m.rating DESC, m.id ASC",
            SortDirective::DateAsc => " ORDER BY m.release_date ASC NULLS LAST, m.id ASC",
            SortDirective::DateDesc => " ORDER BY m.release_date DESC NULLS LAST, m.id ASC",
        }
    }

    /// The same ordering as `order_by`, for stores that sort in process.
    pub fn compare(&self, a: &MovieSummary, b: &MovieSummary) -> Ordering {
        let primary = match self {
            SortDirective::NameAsc => a.name.cmp(&b.name),
            SortDirective::NameDesc => b.name.cmp(&a.name),
            SortDirective::RatingAsc => a.rating.cmp(&b.rating),
            SortDirective::RatingDesc => b.rating.cmp(&a.rating),
            SortDirective::DateAsc => nulls_last(a.release_date, b.release_date, false),
            SortDirective::DateDesc => nulls_last(a.release_date, b.release_date, true),
        };
        primary.then(a.id.cmp(&b.id))
    }
}

fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Display for SortDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for SortDirective {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::UnknownSort(s.to_string()))
    }
}

/// ListingPlan
///
/// What the plain listing does with its `sorting` parameter. An unrecognised token plans no
/// query at all and the listing answers with an empty array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingPlan {
    Sorted(SortDirective),
    Empty,
}

pub fn plan_listing(sorting: Option<&str>) -> ListingPlan {
    match sorting {
        None | Some("") => ListingPlan::Sorted(SortDirective::default()),
        Some(raw) => match SortDirective::parse(raw) {
            Some(directive) => ListingPlan::Sorted(directive),
            None => ListingPlan::Empty,
        },
    }
}

/// MovieFilter
///
/// Which rows the movie query keeps. Search terms are stored as typed and only turned into a
/// LIKE pattern when bound.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MovieFilter {
    #[default]
    All,
    Title(String),
    ActorName(String),
}

impl MovieFilter {
    /// Case-insensitive substring match, equivalent to `ILIKE` on the escaped pattern.
    pub fn matches(term: &str, candidate: &str) -> bool {
        candidate.to_lowercase().contains(&term.to_lowercase())
    }
}

/// MovieQuery
///
/// A fully resolved movie read: a filter plus an ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MovieQuery {
    pub filter: MovieFilter,
    pub sort: SortDirective,
}

impl MovieQuery {
    pub fn listing(sort: SortDirective) -> Self {
        Self {
            filter: MovieFilter::All,
            sort,
        }
    }

    /// query_builder
    ///
    /// Produces the parameterized statement for this query. The search term is bound, never
    /// pushed as text.
    pub fn query_builder(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = match &self.filter {
            MovieFilter::All => {
                QueryBuilder::new(format!("SELECT {MOVIE_COLUMNS} FROM movies AS m"))
            }
            MovieFilter::Title(term) => {
                let mut builder = QueryBuilder::new(format!(
                    "SELECT {MOVIE_COLUMNS} FROM movies AS m WHERE m.name ILIKE "
                ));
                builder.push_bind(like_pattern(term));
                builder
            }
            MovieFilter::ActorName(term) => {
                let pattern = like_pattern(term);
                let mut builder = QueryBuilder::new(format!(
                    "SELECT DISTINCT {MOVIE_COLUMNS} FROM movies AS m \
                     JOIN movie_actors AS ma ON ma.movie_id = m.id \
                     JOIN actors AS a ON a.id = ma.actor_id \
                     WHERE (a.name ILIKE "
                ));
                builder.push_bind(pattern.clone());
                builder.push(" OR a.surname ILIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" OR (a.name || ' ' || a.surname) ILIKE ");
                builder.push_bind(pattern);
                builder.push(")");
                builder
            }
        };
        builder.push(self.sort.order_by());
        builder
    }
}

/// plan_search
///
/// Resolves the search endpoint's parameters. At most one of the two filters may be
/// non-blank; when both are blank the search degrades to the plain listing. Unlike the
/// listing, an unknown `sorting` token here is a client error.
pub fn plan_search(
    movie_name: Option<&str>,
    actor_name: Option<&str>,
    sorting: Option<&str>,
) -> Result<MovieQuery, ValidationError> {
    let movie_name = movie_name.map(str::trim).filter(|s| !s.is_empty());
    let actor_name = actor_name.map(str::trim).filter(|s| !s.is_empty());

    let filter = match (movie_name, actor_name) {
        (Some(_), Some(_)) => return Err(ValidationError::ConflictingSearch),
        (Some(title), None) => MovieFilter::Title(title.to_string()),
        (None, Some(name)) => MovieFilter::ActorName(name.to_string()),
        (None, None) => MovieFilter::All,
    };

    let sort = match sorting {
        None | Some("") => SortDirective::default(),
        Some(raw) => raw.parse()?,
    };

    Ok(MovieQuery { filter, sort })
}

/// Escapes LIKE metacharacters so the term only ever matches itself, then wraps it for a
/// substring match.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_clause_per_directive() {
        for directive in SortDirective::ALL {
            let sql = MovieQuery::listing(directive).query_builder().sql().to_string();
            assert!(sql.ends_with(directive.order_by()), "{sql}");
            assert!(sql.ends_with("m.id ASC"));
        }
    }

    #[test]
    fn test_title_search_binds_instead_of_interpolating() {
        let query = plan_search(Some("'; DROP TABLE movies; --"), None, None).unwrap();
        let builder = query.query_builder();
        let sql = builder.sql();

        assert!(sql.contains("m.name ILIKE $1"));
        assert!(!sql.contains("DROP TABLE"));
        assert!(!sql.contains('%'));
    }

    #[test]
    fn test_actor_search_joins_and_deduplicates() {
        let query = plan_search(None, Some("Reeves"), Some("name_asc")).unwrap();
        let builder = query.query_builder();
        let sql = builder.sql();

        assert!(sql.starts_with("SELECT DISTINCT"));
        assert!(sql.contains("JOIN movie_actors"));
        assert!(sql.contains("a.name ILIKE $1"));
        assert!(sql.contains("a.surname ILIKE $2"));
        assert!(sql.contains("ILIKE $3"));
        assert!(!sql.contains("Reeves"));
        assert!(sql.ends_with(" ORDER BY m.name ASC, m.id ASC"));
    }

    #[test]
    fn test_nulls_sort_last_both_ways() {
        let dated = MovieSummary {
            id: 2,
            release_date: chrono::NaiveDate::from_ymd_opt(1999, 3, 31),
            ..Default::default()
        };
        let undated = MovieSummary {
            id: 1,
            ..Default::default()
        };

        assert_eq!(SortDirective::DateAsc.compare(&dated, &undated), Ordering::Less);
        assert_eq!(SortDirective::DateDesc.compare(&dated, &undated), Ordering::Less);
    }
}
