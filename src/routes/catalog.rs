use super::RouteEntry;
use crate::{
    auth::{MEMBERS, PUBLIC},
    config::AppConfig,
    handlers,
};

/// Catalog read routes
///
/// Movie reads follow `CATALOG_READS_PUBLIC`; actor reads always need a signed-in caller of
/// either role.
pub fn routes(config: &AppConfig) -> Vec<RouteEntry> {
    let movie_reads = if config.catalog_reads_public {
        PUBLIC
    } else {
        MEMBERS
    };

    vec![
        // GET /api/movies?sorting=...
        // Unknown sort tokens answer with an empty list.
        RouteEntry::get("/api/movies", movie_reads, handlers::movies::list_movies),
        // GET /api/movies/search?movie_name=...|actor_name=...&sorting=...
        // Registered as a static segment, so it wins over /api/movies/{id}.
        RouteEntry::get("/api/movies/search", movie_reads, handlers::movies::search_movies),
        RouteEntry::get("/api/movies/{id}", movie_reads, handlers::movies::get_movie),
        // GET /api/actors
        RouteEntry::get("/api/actors", MEMBERS, handlers::actors::list_actors),
        RouteEntry::get("/api/actors/{id}", MEMBERS, handlers::actors::get_actor),
    ]
}
