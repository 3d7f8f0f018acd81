use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::ValidationError;

// --- Identity ---

/// Identity
///
/// A row of the `users` table. Only the Credential Store and the auth handlers ever see the
/// password hash; tokens carry `(id, is_admin)` alone.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Identity {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// RefreshGrant
///
/// A stored refresh secret. `digest` is the BLAKE3 hash of the secret the client holds.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshGrant {
    pub digest: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Credentials
///
/// Body of `POST /api/auth/signUp` and `POST /api/auth/signIn`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.login.trim().is_empty() {
            return Err(ValidationError::Empty("login"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Empty("password"));
        }
        Ok(())
    }
}

// --- Catalog entities ---

/// MovieSummary
///
/// A movie without its cast, as it appears inside an actor's filmography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MovieSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub release_date: Option<NaiveDate>,
    pub rating: i32,
}

/// ActorSummary
///
/// An actor without filmography, as it appears inside a movie's cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ActorSummary {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub gender: String,
    pub birth_date: Option<NaiveDate>,
}

/// Movie
///
/// Catalog read model: a movie together with its cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Movie {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub release_date: Option<NaiveDate>,
    pub rating: i32,
    pub actors: Vec<ActorSummary>,
}

impl Movie {
    pub fn with_cast(summary: MovieSummary, actors: Vec<ActorSummary>) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            description: summary.description,
            release_date: summary.release_date,
            rating: summary.rating,
            actors,
        }
    }
}

/// Actor
///
/// Catalog read model: an actor together with their filmography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub gender: String,
    pub birth_date: Option<NaiveDate>,
    pub movies: Vec<MovieSummary>,
}

impl Actor {
    pub fn with_filmography(summary: ActorSummary, movies: Vec<MovieSummary>) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            surname: summary.surname,
            gender: summary.gender,
            birth_date: summary.birth_date,
            movies,
        }
    }
}

// --- Request payloads ---

const MAX_MOVIE_NAME: usize = 150;
const MAX_DESCRIPTION: usize = 1000;
const RATING_RANGE: std::ops::RangeInclusive<i32> = 0..=10;

/// NewMovie
///
/// Body of `POST /api/movies`. `actor_ids` links existing actors to the new movie.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewMovie {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub rating: i32,
    #[serde(default)]
    pub actor_ids: Vec<i64>,
}

impl NewMovie {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_movie_fields(Some(&self.name), Some(&self.description), Some(self.rating))
    }
}

/// MovieUpdate
///
/// Body of `PUT /api/movies/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MovieUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
}

impl MovieUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_movie_fields(self.name.as_deref(), self.description.as_deref(), self.rating)
    }
}

fn validate_movie_fields(
    name: Option<&str>,
    description: Option<&str>,
    rating: Option<i32>,
) -> Result<(), ValidationError> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(ValidationError::Empty("name"));
        }
        if name.chars().count() > MAX_MOVIE_NAME {
            return Err(ValidationError::OutOfRange { field: "name" });
        }
    }
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION) {
        return Err(ValidationError::OutOfRange {
            field: "description",
        });
    }
    if rating.is_some_and(|r| !RATING_RANGE.contains(&r)) {
        return Err(ValidationError::OutOfRange { field: "rating" });
    }
    Ok(())
}

/// NewActor
///
/// Body of `POST /api/actors`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewActor {
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub gender: String,
    pub birth_date: Option<NaiveDate>,
}

impl NewActor {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Empty("name"));
        }
        Ok(())
    }
}

/// ActorUpdate
///
/// Body of `PUT /api/actors/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ActorUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

impl ActorUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ValidationError::Empty("name"));
        }
        Ok(())
    }
}

/// ActorLink
///
/// Body of `POST /api/movies/{id}/actors`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ActorLink {
    pub id: i64,
}

/// Created
///
/// Response to a successful create: the id the store assigned.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Created {
    pub id: i64,
}

/// StatusBody
///
/// The `{"status": <code>}` envelope. Successful auth and mutation calls answer with it, and
/// every error response uses the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatusBody {
    pub status: u16,
}

impl StatusBody {
    pub fn ok() -> Self {
        Self { status: 200 }
    }
}
