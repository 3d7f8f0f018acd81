use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    catalog,
    error::ApiError,
    models::{ActorLink, Created, Movie, MovieUpdate, NewMovie, StatusBody},
    repository::CatalogState,
};

// --- Query Parameters ---

/// ListingParams
///
/// Query string of `GET /api/movies`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingParams {
    /// One of `name_asc`, `name_desc`, `rating_asc`, `rating_desc`, `date_asc`, `date_desc`.
    /// Absent means `rating_desc`; anything else yields an empty list.
    pub sorting: Option<String>,
}

/// SearchParams
///
/// Query string of `GET /api/movies/search`. At most one of the two filters may be set.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Case-insensitive substring of the movie title.
    pub movie_name: Option<String>,
    /// Case-insensitive substring of an actor's name, surname or full name.
    pub actor_name: Option<String>,
    /// Same tokens as the listing; an unknown token is a 400 here.
    pub sorting: Option<String>,
}

// --- Reads ---

/// list_movies
///
/// [Catalog Read] Lists every movie with its cast in the requested order.
#[utoipa::path(
    get,
    path = "/api/movies",
    params(ListingParams),
    responses(
        (status = 200, description = "Movies, possibly empty", body = [Movie]),
        (status = 403, description = "Sign-in required when catalog reads are restricted", body = StatusBody)
    )
)]
pub async fn list_movies(
    State(store): State<CatalogState>,
    params: Result<Query<ListingParams>, QueryRejection>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let Query(params) = params?;
    let movies = catalog::list_movies(&store, params.sorting.as_deref()).await?;
    Ok(Json(movies))
}

/// search_movies
///
/// [Catalog Read] Filters movies by title or by actor. Both filters blank behaves like the
/// plain listing.
#[utoipa::path(
    get,
    path = "/api/movies/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching movies", body = [Movie]),
        (status = 400, description = "Both filters set, or unknown sort", body = StatusBody)
    )
)]
pub async fn search_movies(
    State(store): State<CatalogState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let Query(params) = params?;
    let movies = catalog::search_movies(
        &store,
        params.movie_name.as_deref(),
        params.actor_name.as_deref(),
        params.sorting.as_deref(),
    )
    .await?;
    Ok(Json(movies))
}

/// get_movie
///
/// [Catalog Read] A single movie with its cast.
#[utoipa::path(
    get,
    path = "/api/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Found", body = Movie),
        (status = 404, description = "No such movie", body = StatusBody)
    )
)]
pub async fn get_movie(
    State(store): State<CatalogState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Movie>, ApiError> {
    let Path(id) = id?;
    Ok(Json(catalog::get_movie(&store, id).await?))
}

// --- Mutations (Admin) ---

/// create_movie
///
/// [Admin Route] Adds a movie, optionally linking existing actors in the same step.
#[utoipa::path(
    post,
    path = "/api/movies",
    request_body = NewMovie,
    responses(
        (status = 200, description = "Created", body = Created),
        (status = 400, description = "Invalid fields or unknown actor id", body = StatusBody),
        (status = 403, description = "Not an administrator", body = StatusBody)
    )
)]
pub async fn create_movie(
    AuthUser(admin): AuthUser,
    State(store): State<CatalogState>,
    payload: Result<Json<NewMovie>, JsonRejection>,
) -> Result<Json<Created>, ApiError> {
    let Json(movie) = payload?;
    movie.validate()?;

    let id = store.create_movie(&movie).await?;
    tracing::info!(subject_id = admin.user_id, movie_id = id, "movie created");
    Ok(Json(Created { id }))
}

/// update_movie
///
/// [Admin Route] Partial update; absent fields keep their stored values.
#[utoipa::path(
    put,
    path = "/api/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    request_body = MovieUpdate,
    responses(
        (status = 200, description = "Updated", body = StatusBody),
        (status = 404, description = "No such movie", body = StatusBody)
    )
)]
pub async fn update_movie(
    AuthUser(admin): AuthUser,
    State(store): State<CatalogState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MovieUpdate>, JsonRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    update.validate()?;

    if !store.update_movie(id, &update).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(subject_id = admin.user_id, movie_id = id, "movie updated");
    Ok(Json(StatusBody::ok()))
}

/// delete_movie
///
/// [Admin Route] Removes a movie and its cast links.
#[utoipa::path(
    delete,
    path = "/api/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Deleted", body = StatusBody),
        (status = 404, description = "No such movie", body = StatusBody)
    )
)]
pub async fn delete_movie(
    AuthUser(admin): AuthUser,
    State(store): State<CatalogState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Path(id) = id?;
    if !store.delete_movie(id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(subject_id = admin.user_id, movie_id = id, "movie deleted");
    Ok(Json(StatusBody::ok()))
}

/// link_actor
///
/// [Admin Route] Adds an existing actor to a movie's cast. Linking twice is a no-op.
#[utoipa::path(
    post,
    path = "/api/movies/{id}/actors",
    params(("id" = i64, Path, description = "Movie ID")),
    request_body = ActorLink,
    responses(
        (status = 200, description = "Linked", body = StatusBody),
        (status = 400, description = "Unknown movie or actor", body = StatusBody)
    )
)]
pub async fn link_actor(
    AuthUser(admin): AuthUser,
    State(store): State<CatalogState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ActorLink>, JsonRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Path(movie_id) = id?;
    let Json(link) = payload?;

    store.link_actor(movie_id, link.id).await?;
    tracing::info!(subject_id = admin.user_id, movie_id, actor_id = link.id, "actor linked");
    Ok(Json(StatusBody::ok()))
}

/// unlink_actor
///
/// [Admin Route] Removes an actor from a movie's cast.
#[utoipa::path(
    delete,
    path = "/api/movies/{id}/actors/{actor_id}",
    params(
        ("id" = i64, Path, description = "Movie ID"),
        ("actor_id" = i64, Path, description = "Actor ID")
    ),
    responses(
        (status = 200, description = "Unlinked", body = StatusBody),
        (status = 404, description = "Actor was not in the cast", body = StatusBody)
    )
)]
pub async fn unlink_actor(
    AuthUser(admin): AuthUser,
    State(store): State<CatalogState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Path((movie_id, actor_id)) = ids?;
    if !store.unlink_actor(movie_id, actor_id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(subject_id = admin.user_id, movie_id, actor_id, "actor unlinked");
    Ok(Json(StatusBody::ok()))
}
