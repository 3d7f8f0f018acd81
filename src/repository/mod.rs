use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::StoreError,
    models::{
        ActorSummary, ActorUpdate, Identity, MovieSummary, MovieUpdate, NewActor, NewMovie,
        RefreshGrant,
    },
    query::MovieQuery,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// CredentialStore
///
/// Persistence contract for identities and refresh grants. The store owns the password
/// representation; callers hand it an already-hashed value.
///
/// **Send + Sync + async_trait** make `Arc<dyn CredentialStore>` usable from any handler task.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a new identity and returns the id the store assigned.
    /// A duplicate login is `StoreError::Conflict`.
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i64, StoreError>;
    async fn get_user_by_login(&self, login: &str) -> Result<Option<Identity>, StoreError>;
    async fn get_user(&self, id: i64) -> Result<Option<Identity>, StoreError>;
    /// Removes an identity together with its refresh grants. Returns false when no identity
    /// has that id.
    async fn delete_user(&self, id: i64) -> Result<bool, StoreError>;

    // --- Refresh grants ---
    async fn save_refresh_grant(&self, grant: RefreshGrant) -> Result<(), StoreError>;
    /// Removes and returns the grant for `digest`, so each refresh secret works at most once.
    async fn take_refresh_grant(&self, digest: &str) -> Result<Option<RefreshGrant>, StoreError>;
    async fn revoke_refresh_grants(&self, user_id: i64) -> Result<u64, StoreError>;
}

/// CatalogStore
///
/// Persistence contract for movies, actors and the link between them. Read methods return
/// bare summaries; attaching cast and filmography is the catalog layer's job.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // --- Movies ---
    async fn list_movies(&self, query: &MovieQuery) -> Result<Vec<MovieSummary>, StoreError>;
    async fn get_movie(&self, id: i64) -> Result<Option<MovieSummary>, StoreError>;
    /// Dependent fetch: the cast of one movie.
    async fn cast_of(&self, movie_id: i64) -> Result<Vec<ActorSummary>, StoreError>;
    async fn create_movie(&self, movie: &NewMovie) -> Result<i64, StoreError>;
    /// Returns false when no movie has that id.
    async fn update_movie(&self, id: i64, update: &MovieUpdate) -> Result<bool, StoreError>;
    async fn delete_movie(&self, id: i64) -> Result<bool, StoreError>;
    /// Idempotent. An unknown movie or actor is `StoreError::MissingReference`.
    async fn link_actor(&self, movie_id: i64, actor_id: i64) -> Result<(), StoreError>;
    async fn unlink_actor(&self, movie_id: i64, actor_id: i64) -> Result<bool, StoreError>;

    // --- Actors ---
    async fn list_actors(&self) -> Result<Vec<ActorSummary>, StoreError>;
    async fn get_actor(&self, id: i64) -> Result<Option<ActorSummary>, StoreError>;
    /// Dependent fetch: the movies one actor appears in.
    async fn filmography_of(&self, actor_id: i64) -> Result<Vec<MovieSummary>, StoreError>;
    async fn create_actor(&self, actor: &NewActor) -> Result<i64, StoreError>;
    async fn update_actor(&self, id: i64, update: &ActorUpdate) -> Result<bool, StoreError>;
    async fn delete_actor(&self, id: i64) -> Result<bool, StoreError>;
}

pub type CredentialState = Arc<dyn CredentialStore>;
pub type CatalogState = Arc<dyn CatalogStore>;
