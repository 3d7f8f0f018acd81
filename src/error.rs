use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ConfigError
///
/// Raised while assembling the startup configuration. Any of these is fatal: the process
/// must not bind its listener with a partially valid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// AuthError
///
/// Reasons a presented token was refused. The variants are only ever written to internal
/// logs; the Access Guard collapses all of them into the same 403.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

#[derive(Debug, Error)]
#[error("failed to sign session token: {0}")]
pub struct SigningError(#[from] jsonwebtoken::errors::Error);

#[derive(Debug, Error)]
#[error("entropy source unavailable: {0}")]
pub struct RandomnessError(#[from] getrandom::Error);

/// ValidationError
///
/// Malformed or contradictory request shapes, detected before any store call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("movie_name and actor_name cannot both be set")]
    ConflictingSearch,
    #[error("unknown sort directive {0:?}")]
    UnknownSort(String),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{field} is out of range")]
    OutOfRange { field: &'static str },
    #[error("request could not be decoded: {0}")]
    Malformed(String),
}

/// StoreError
///
/// Failures reported by the Credential or Catalog store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("record already exists")]
    Conflict,
    #[error("referenced record does not exist")]
    MissingReference,
}

/// ApiError
///
/// The single error type handlers return. Its response is always the bare JSON status
/// envelope; detail is logged here and never leaves the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Randomness(#[from] RandomnessError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::MissingReference) => StatusCode::BAD_REQUEST,
            ApiError::Store(_)
            | ApiError::Signing(_)
            | ApiError::Randomness(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The `{"status": <code>}` body shared by every non-data response.
pub fn status_envelope(status: StatusCode) -> Response {
    (status, Json(json!({ "status": status.as_u16() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        status_envelope(status)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationError::Malformed(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(ValidationError::Malformed(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(ValidationError::Malformed(rejection.body_text()))
    }
}
