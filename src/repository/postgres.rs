use async_trait::async_trait;
use sqlx::PgPool;

use super::{CatalogStore, CredentialStore};
use crate::{
    error::StoreError,
    models::{
        ActorSummary, ActorUpdate, Identity, MovieSummary, MovieUpdate, NewActor, NewMovie,
        RefreshGrant,
    },
    query::MovieQuery,
};

/// PostgresRepository
///
/// Both stores backed by one `PgPool`. Every statement is a fixed string with positional
/// binds; the only dynamically assembled statement is the movie read, which comes from the
/// query planner.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps constraint violations onto the store's own error kinds.
fn classify(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StoreError::MissingReference;
        }
    }
    StoreError::Database(e)
}

const MOVIE_SUMMARY: &str = "SELECT id, name, description, release_date, rating FROM movies";
const ACTOR_SUMMARY: &str = "SELECT id, name, surname, gender, birth_date FROM actors";

#[async_trait]
impl CredentialStore for PostgresRepository {
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i64, StoreError> {
        sqlx::query_scalar(
            "INSERT INTO users (login, password_hash, is_admin) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(login)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<Identity>, StoreError> {
        sqlx::query_as::<_, Identity>(
            "SELECT id, login, password_hash, is_admin FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_user(&self, id: i64) -> Result<Option<Identity>, StoreError> {
        sqlx::query_as::<_, Identity>(
            "SELECT id, login, password_hash, is_admin FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    /// Refresh grants go with the identity through `ON DELETE CASCADE`.
    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_refresh_grant(&self, grant: RefreshGrant) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO refresh_tokens (digest, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&grant.digest)
            .bind(grant.user_id)
            .bind(grant.expires_at)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    /// take_refresh_grant
    ///
    /// `DELETE ... RETURNING` makes lookup and consumption one atomic step, so two concurrent
    /// refreshes with the same secret cannot both succeed.
    async fn take_refresh_grant(&self, digest: &str) -> Result<Option<RefreshGrant>, StoreError> {
        sqlx::query_as::<_, RefreshGrant>(
            "DELETE FROM refresh_tokens WHERE digest = $1 RETURNING digest, user_id, expires_at",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn revoke_refresh_grants(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CatalogStore for PostgresRepository {
    async fn list_movies(&self, query: &MovieQuery) -> Result<Vec<MovieSummary>, StoreError> {
        let mut builder = query.query_builder();
        builder
            .build_query_as::<MovieSummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn get_movie(&self, id: i64) -> Result<Option<MovieSummary>, StoreError> {
        sqlx::query_as::<_, MovieSummary>(&format!("{MOVIE_SUMMARY} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn cast_of(&self, movie_id: i64) -> Result<Vec<ActorSummary>, StoreError> {
        sqlx::query_as::<_, ActorSummary>(
            "SELECT a.id, a.name, a.surname, a.gender, a.birth_date FROM actors AS a \
             JOIN movie_actors AS ma ON ma.actor_id = a.id \
             WHERE ma.movie_id = $1 ORDER BY a.surname, a.name, a.id",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    /// create_movie
    ///
    /// Inserts the movie and its initial cast links in one transaction; an unknown actor id
    /// rolls back the whole insert.
    async fn create_movie(&self, movie: &NewMovie) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO movies (name, description, release_date, rating) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&movie.name)
        .bind(&movie.description)
        .bind(movie.release_date)
        .bind(movie.rating)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        for actor_id in &movie.actor_ids {
            sqlx::query(
                "INSERT INTO movie_actors (movie_id, actor_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(actor_id)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }

        tx.commit().await.map_err(classify)?;
        Ok(id)
    }

    /// update_movie
    ///
    /// `COALESCE` keeps the stored column whenever the corresponding field is `None`.
    async fn update_movie(&self, id: i64, update: &MovieUpdate) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE movies \
             SET name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 release_date = COALESCE($4, release_date), \
                 rating = COALESCE($5, rating) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.release_date)
        .bind(update.rating)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_movie(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }

    async fn link_actor(&self, movie_id: i64, actor_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO movie_actors (movie_id, actor_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(movie_id)
        .bind(actor_id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn unlink_actor(&self, movie_id: i64, actor_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM movie_actors WHERE movie_id = $1 AND actor_id = $2")
            .bind(movie_id)
            .bind(actor_id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_actors(&self) -> Result<Vec<ActorSummary>, StoreError> {
        sqlx::query_as::<_, ActorSummary>(&format!("{ACTOR_SUMMARY} ORDER BY surname, name, id"))
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
    }

    async fn get_actor(&self, id: i64) -> Result<Option<ActorSummary>, StoreError> {
        sqlx::query_as::<_, ActorSummary>(&format!("{ACTOR_SUMMARY} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn filmography_of(&self, actor_id: i64) -> Result<Vec<MovieSummary>, StoreError> {
        sqlx::query_as::<_, MovieSummary>(
            "SELECT m.id, m.name, m.description, m.release_date, m.rating FROM movies AS m \
             JOIN movie_actors AS ma ON ma.movie_id = m.id \
             WHERE ma.actor_id = $1 ORDER BY m.release_date DESC NULLS LAST, m.id",
        )
        .bind(actor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn create_actor(&self, actor: &NewActor) -> Result<i64, StoreError> {
        sqlx::query_scalar(
            "INSERT INTO actors (name, surname, gender, birth_date) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&actor.name)
        .bind(&actor.surname)
        .bind(&actor.gender)
        .bind(actor.birth_date)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_actor(&self, id: i64, update: &ActorUpdate) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE actors \
             SET name = COALESCE($2, name), \
                 surname = COALESCE($3, surname), \
                 gender = COALESCE($4, gender), \
                 birth_date = COALESCE($5, birth_date) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.surname.as_deref())
        .bind(update.gender.as_deref())
        .bind(update.birth_date)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_actor(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM actors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }
}
