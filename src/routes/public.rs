use super::RouteEntry;
use crate::{auth::PUBLIC, handlers};

/// Public routes
///
/// Reachable without a credential. The auth endpoints are where credentials come from, so
/// they cannot require one.
pub fn routes() -> Vec<RouteEntry> {
    vec![
        // GET /health
        // Liveness probe for load balancers.
        RouteEntry::get("/health", PUBLIC, handlers::health),
        // POST /api/auth/signUp
        // Creates a client identity and sets the session cookies.
        RouteEntry::post("/api/auth/signUp", PUBLIC, handlers::auth::sign_up),
        // POST /api/auth/signIn
        RouteEntry::post("/api/auth/signIn", PUBLIC, handlers::auth::sign_in),
        // POST /api/auth/refresh
        // Rotates the session using the RefreshToken cookie.
        RouteEntry::post("/api/auth/refresh", PUBLIC, handlers::auth::refresh),
        // POST /api/auth/logout
        RouteEntry::post("/api/auth/logout", PUBLIC, handlers::auth::logout),
    ]
}
