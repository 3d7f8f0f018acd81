use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, StatusCode},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod query;
pub mod repository;
pub mod token;

// Declarative route table (public, catalog reads, admin mutations).
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{
    CatalogState, CredentialState, MemoryRepository, PostgresRepository,
};
pub use token::TokenService;

use error::status_envelope;

/// ApiDoc
///
/// OpenAPI document for every route in the table, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::sign_up, handlers::auth::sign_in, handlers::auth::refresh,
        handlers::auth::logout,
        handlers::movies::list_movies, handlers::movies::search_movies, handlers::movies::get_movie,
        handlers::movies::create_movie, handlers::movies::update_movie,
        handlers::movies::delete_movie, handlers::movies::link_actor,
        handlers::movies::unlink_actor,
        handlers::actors::list_actors, handlers::actors::get_actor, handlers::actors::create_actor,
        handlers::actors::update_actor, handlers::actors::delete_actor
    ),
    components(
        schemas(
            models::Credentials, models::Movie, models::MovieSummary, models::Actor,
            models::ActorSummary, models::NewMovie, models::MovieUpdate, models::NewActor,
            models::ActorUpdate, models::ActorLink, models::Created, models::StatusBody,
        )
    ),
    tags(
        (name = "movie-catalog", description = "Movie and actor catalog API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Identities and refresh grants.
    pub credentials: CredentialState,
    /// Movies, actors and the cast links between them.
    pub catalog: CatalogState,
    /// Built once at startup from the configured secret; never re-initialized.
    pub tokens: Arc<TokenService>,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for CatalogState {
    fn from_ref(app_state: &AppState) -> CatalogState {
        app_state.catalog.clone()
    }
}

/// create_router
///
/// Mounts the route table, the API docs and the JSON fallbacks, then wraps everything in the
/// observability, timeout and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let table = routes::route_table(&state.config);
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes::mount(table, &state.tokens))
        .fallback(|| async { status_envelope(StatusCode::NOT_FOUND) })
        .method_not_allowed_fallback(|| async { status_envelope(StatusCode::METHOD_NOT_ALLOWED) })
        .with_state(state.clone());

    // Dropping the handler future on timeout also drops any in-flight query.
    #[allow(deprecated)]
    let timeout = TimeoutLayer::new(state.config.request_timeout);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(timeout),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagged with the `x-request-id` stamped by `SetRequestIdLayer`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
