use super::RouteEntry;
use crate::{auth::ADMIN_ONLY, handlers};

/// Admin routes
///
/// Every catalog mutation. The guard rejects clients before the handler runs; handlers only
/// use the admitted principal for audit logging.
pub fn routes() -> Vec<RouteEntry> {
    vec![
        // --- Movies ---
        RouteEntry::post("/api/movies", ADMIN_ONLY, handlers::movies::create_movie),
        RouteEntry::put("/api/movies/{id}", ADMIN_ONLY, handlers::movies::update_movie),
        RouteEntry::delete("/api/movies/{id}", ADMIN_ONLY, handlers::movies::delete_movie),
        // POST /api/movies/{id}/actors  body: {"id": <actor id>}
        RouteEntry::post("/api/movies/{id}/actors", ADMIN_ONLY, handlers::movies::link_actor),
        RouteEntry::delete(
            "/api/movies/{id}/actors/{actor_id}",
            ADMIN_ONLY,
            handlers::movies::unlink_actor,
        ),
        // --- Actors ---
        RouteEntry::post("/api/actors", ADMIN_ONLY, handlers::actors::create_actor),
        RouteEntry::put("/api/actors/{id}", ADMIN_ONLY, handlers::actors::update_actor),
        RouteEntry::delete("/api/actors/{id}", ADMIN_ONLY, handlers::actors::delete_actor),
    ]
}
