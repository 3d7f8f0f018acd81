//! HTTP handlers, grouped by resource. Access control is not done here: every handler sits
//! behind the guard layer its route table entry declares.

pub mod actors;
pub mod auth;
pub mod movies;

use axum::Json;

use crate::models::StatusBody;

/// health
///
/// [Public Route] Liveness probe for load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = StatusBody))
)]
pub async fn health() -> Json<StatusBody> {
    Json(StatusBody::ok())
}
