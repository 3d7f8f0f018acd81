use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};

use crate::{
    auth::AuthUser,
    catalog,
    error::ApiError,
    models::{Actor, ActorUpdate, Created, NewActor, StatusBody},
    repository::CatalogState,
};

/// list_actors
///
/// [Member Route] Every actor with their filmography, ordered by surname.
#[utoipa::path(
    get,
    path = "/api/actors",
    responses(
        (status = 200, description = "Actors", body = [Actor]),
        (status = 403, description = "Not signed in", body = StatusBody)
    )
)]
pub async fn list_actors(State(store): State<CatalogState>) -> Result<Json<Vec<Actor>>, ApiError> {
    Ok(Json(catalog::list_actors(&store).await?))
}

/// get_actor
///
/// [Member Route] A single actor with their filmography.
#[utoipa::path(
    get,
    path = "/api/actors/{id}",
    params(("id" = i64, Path, description = "Actor ID")),
    responses(
        (status = 200, description = "Found", body = Actor),
        (status = 404, description = "No such actor", body = StatusBody)
    )
)]
pub async fn get_actor(
    State(store): State<CatalogState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Actor>, ApiError> {
    let Path(id) = id?;
    Ok(Json(catalog::get_actor(&store, id).await?))
}

/// create_actor
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/actors",
    request_body = NewActor,
    responses(
        (status = 200, description = "Created", body = Created),
        (status = 400, description = "Invalid fields", body = StatusBody)
    )
)]
pub async fn create_actor(
    AuthUser(admin): AuthUser,
    State(store): State<CatalogState>,
    payload: Result<Json<NewActor>, JsonRejection>,
) -> Result<Json<Created>, ApiError> {
    let Json(actor) = payload?;
    actor.validate()?;

    let id = store.create_actor(&actor).await?;
    tracing::info!(subject_id = admin.user_id, actor_id = id, "actor created");
    Ok(Json(Created { id }))
}

/// update_actor
///
/// [Admin Route] Partial update; absent fields keep their stored values.
#[utoipa::path(
    put,
    path = "/api/actors/{id}",
    params(("id" = i64, Path, description = "Actor ID")),
    request_body = ActorUpdate,
    responses(
        (status = 200, description = "Updated", body = StatusBody),
        (status = 404, description = "No such actor", body = StatusBody)
    )
)]
pub async fn update_actor(
    AuthUser(admin): AuthUser,
    State(store): State<CatalogState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ActorUpdate>, JsonRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    update.validate()?;

    if !store.update_actor(id, &update).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(subject_id = admin.user_id, actor_id = id, "actor updated");
    Ok(Json(StatusBody::ok()))
}

/// delete_actor
///
/// [Admin Route] Removes an actor and drops them from every cast.
#[utoipa::path(
    delete,
    path = "/api/actors/{id}",
    params(("id" = i64, Path, description = "Actor ID")),
    responses(
        (status = 200, description = "Deleted", body = StatusBody),
        (status = 404, description = "No such actor", body = StatusBody)
    )
)]
pub async fn delete_actor(
    AuthUser(admin): AuthUser,
    State(store): State<CatalogState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Path(id) = id?;
    if !store.delete_actor(id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(subject_id = admin.user_id, actor_id = id, "actor deleted");
    Ok(Json(StatusBody::ok()))
}
