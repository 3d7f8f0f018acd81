//! Catalog reads: planned movie queries plus the dependent cast and filmography fetches.

use std::sync::Arc;

use crate::{
    error::{ApiError, StoreError},
    models::{Actor, ActorSummary, Movie, MovieSummary},
    query::{ListingPlan, MovieQuery, plan_listing, plan_search},
    repository::CatalogStore,
};

/// list_movies
///
/// The plain listing. An unrecognised `sorting` token returns an empty list without touching
/// the store.
pub async fn list_movies(
    store: &Arc<dyn CatalogStore>,
    sorting: Option<&str>,
) -> Result<Vec<Movie>, ApiError> {
    match plan_listing(sorting) {
        ListingPlan::Sorted(sort) => fetch_movies(store, &MovieQuery::listing(sort)).await,
        ListingPlan::Empty => {
            tracing::debug!(sorting, "unknown listing sort; answering with no movies");
            Ok(Vec::new())
        }
    }
}

/// search_movies
///
/// Validation happens entirely in `plan_search`, so a contradictory request never reaches the
/// store.
pub async fn search_movies(
    store: &Arc<dyn CatalogStore>,
    movie_name: Option<&str>,
    actor_name: Option<&str>,
    sorting: Option<&str>,
) -> Result<Vec<Movie>, ApiError> {
    let query = plan_search(movie_name, actor_name, sorting)?;
    fetch_movies(store, &query).await
}

pub async fn fetch_movies(
    store: &Arc<dyn CatalogStore>,
    query: &MovieQuery,
) -> Result<Vec<Movie>, ApiError> {
    let summaries = store.list_movies(query).await?;

    let mut movies = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let cast = cast_or_empty(store, summary.id).await;
        movies.push(Movie::with_cast(summary, cast));
    }
    Ok(movies)
}

pub async fn get_movie(store: &Arc<dyn CatalogStore>, id: i64) -> Result<Movie, ApiError> {
    let summary = store.get_movie(id).await?.ok_or(ApiError::NotFound)?;
    let cast = cast_or_empty(store, id).await;
    Ok(Movie::with_cast(summary, cast))
}

pub async fn list_actors(store: &Arc<dyn CatalogStore>) -> Result<Vec<Actor>, ApiError> {
    let summaries = store.list_actors().await?;

    let mut actors = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let movies = filmography_or_empty(store, summary.id).await;
        actors.push(Actor::with_filmography(summary, movies));
    }
    Ok(actors)
}

pub async fn get_actor(store: &Arc<dyn CatalogStore>, id: i64) -> Result<Actor, ApiError> {
    let summary = store.get_actor(id).await?.ok_or(ApiError::NotFound)?;
    let movies = filmography_or_empty(store, id).await;
    Ok(Actor::with_filmography(summary, movies))
}

// A failed dependent fetch leaves the collection empty; the primary record is still returned.

async fn cast_or_empty(store: &Arc<dyn CatalogStore>, movie_id: i64) -> Vec<ActorSummary> {
    store
        .cast_of(movie_id)
        .await
        .unwrap_or_else(|e| degraded("cast", movie_id, e))
}

async fn filmography_or_empty(store: &Arc<dyn CatalogStore>, actor_id: i64) -> Vec<MovieSummary> {
    store
        .filmography_of(actor_id)
        .await
        .unwrap_or_else(|e| degraded("filmography", actor_id, e))
}

fn degraded<T>(relation: &'static str, id: i64, error: StoreError) -> Vec<T> {
    tracing::warn!(relation, id, error = %error, "dependent fetch failed; returning empty");
    Vec::new()
}
