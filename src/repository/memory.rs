use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{CatalogStore, CredentialStore};
use crate::{
    error::StoreError,
    models::{
        ActorSummary, ActorUpdate, Identity, MovieSummary, MovieUpdate, NewActor, NewMovie,
        RefreshGrant,
    },
    query::{MovieFilter, MovieQuery},
};

#[derive(Default)]
struct State {
    next_user_id: i64,
    next_movie_id: i64,
    next_actor_id: i64,
    users: BTreeMap<i64, Identity>,
    movies: BTreeMap<i64, MovieSummary>,
    actors: BTreeMap<i64, ActorSummary>,
    /// `(movie_id, actor_id)` pairs.
    links: BTreeSet<(i64, i64)>,
    grants: HashMap<String, RefreshGrant>,
}

impl State {
    fn allocate(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn cast_ids(&self, movie_id: i64) -> impl Iterator<Item = i64> + '_ {
        self.links
            .range((movie_id, i64::MIN)..=(movie_id, i64::MAX))
            .map(|&(_, actor_id)| actor_id)
    }

    fn actor_matches(actor: &ActorSummary, term: &str) -> bool {
        MovieFilter::matches(term, &actor.name)
            || MovieFilter::matches(term, &actor.surname)
            || MovieFilter::matches(term, &format!("{} {}", actor.name, actor.surname))
    }

    fn keeps(&self, movie: &MovieSummary, filter: &MovieFilter) -> bool {
        match filter {
            MovieFilter::All => true,
            MovieFilter::Title(term) => MovieFilter::matches(term, &movie.name),
            MovieFilter::ActorName(term) => self
                .cast_ids(movie.id)
                .filter_map(|id| self.actors.get(&id))
                .any(|actor| Self::actor_matches(actor, term)),
        }
    }
}

/// MemoryRepository
///
/// Process-local implementation of both stores. It mirrors the Postgres constraints (unique
/// logins, link foreign keys, cascade on delete) so handlers behave the same against either.
/// The lock is never held across an `.await`.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryRepository {
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i64, StoreError> {
        let mut state = self.state.lock();
        if state.users.values().any(|u| u.login == login) {
            return Err(StoreError::Conflict);
        }
        let id = State::allocate(&mut state.next_user_id);
        state.users.insert(
            id,
            Identity {
                id,
                login: login.to_string(),
                password_hash: password_hash.to_string(),
                is_admin,
            },
        );
        Ok(id)
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<Identity>, StoreError> {
        let state = self.state.lock();
        Ok(state.users.values().find(|u| u.login == login).cloned())
    }

    async fn get_user(&self, id: i64) -> Result<Option<Identity>, StoreError> {
        Ok(self.state.lock().users.get(&id).cloned())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.grants.retain(|_, grant| grant.user_id != id);
        Ok(true)
    }

    async fn save_refresh_grant(&self, grant: RefreshGrant) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.users.contains_key(&grant.user_id) {
            return Err(StoreError::MissingReference);
        }
        if state.grants.contains_key(&grant.digest) {
            return Err(StoreError::Conflict);
        }
        state.grants.insert(grant.digest.clone(), grant);
        Ok(())
    }

    async fn take_refresh_grant(&self, digest: &str) -> Result<Option<RefreshGrant>, StoreError> {
        Ok(self.state.lock().grants.remove(digest))
    }

    async fn revoke_refresh_grants(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        let before = state.grants.len();
        state.grants.retain(|_, grant| grant.user_id != user_id);
        Ok((before - state.grants.len()) as u64)
    }
}

#[async_trait]
impl CatalogStore for MemoryRepository {
    async fn list_movies(&self, query: &MovieQuery) -> Result<Vec<MovieSummary>, StoreError> {
        let state = self.state.lock();
        let mut movies: Vec<MovieSummary> = state
            .movies
            .values()
            .filter(|movie| state.keeps(movie, &query.filter))
            .cloned()
            .collect();
        movies.sort_by(|a, b| query.sort.compare(a, b));
        Ok(movies)
    }

    async fn get_movie(&self, id: i64) -> Result<Option<MovieSummary>, StoreError> {
        Ok(self.state.lock().movies.get(&id).cloned())
    }

    async fn cast_of(&self, movie_id: i64) -> Result<Vec<ActorSummary>, StoreError> {
        let state = self.state.lock();
        let mut cast: Vec<ActorSummary> = state
            .cast_ids(movie_id)
            .filter_map(|id| state.actors.get(&id).cloned())
            .collect();
        cast.sort_by(|a, b| {
            (&a.surname, &a.name, a.id).cmp(&(&b.surname, &b.name, b.id))
        });
        Ok(cast)
    }

    async fn create_movie(&self, movie: &NewMovie) -> Result<i64, StoreError> {
        let mut state = self.state.lock();
        if movie.actor_ids.iter().any(|id| !state.actors.contains_key(id)) {
            return Err(StoreError::MissingReference);
        }
        let id = State::allocate(&mut state.next_movie_id);
        state.movies.insert(
            id,
            MovieSummary {
                id,
                name: movie.name.clone(),
                description: movie.description.clone(),
                release_date: movie.release_date,
                rating: movie.rating,
            },
        );
        for &actor_id in &movie.actor_ids {
            state.links.insert((id, actor_id));
        }
        Ok(id)
    }

    async fn update_movie(&self, id: i64, update: &MovieUpdate) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let Some(movie) = state.movies.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(name) = &update.name {
            movie.name = name.clone();
        }
        if let Some(description) = &update.description {
            movie.description = description.clone();
        }
        if update.release_date.is_some() {
            movie.release_date = update.release_date;
        }
        if let Some(rating) = update.rating {
            movie.rating = rating;
        }
        Ok(true)
    }

    async fn delete_movie(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let removed = state.movies.remove(&id).is_some();
        state.links.retain(|&(movie_id, _)| movie_id != id);
        Ok(removed)
    }

    async fn link_actor(&self, movie_id: i64, actor_id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.movies.contains_key(&movie_id) || !state.actors.contains_key(&actor_id) {
            return Err(StoreError::MissingReference);
        }
        state.links.insert((movie_id, actor_id));
        Ok(())
    }

    async fn unlink_actor(&self, movie_id: i64, actor_id: i64) -> Result<bool, StoreError> {
        Ok(self.state.lock().links.remove(&(movie_id, actor_id)))
    }

    async fn list_actors(&self) -> Result<Vec<ActorSummary>, StoreError> {
        let state = self.state.lock();
        let mut actors: Vec<ActorSummary> = state.actors.values().cloned().collect();
        actors.sort_by(|a, b| {
            (&a.surname, &a.name, a.id).cmp(&(&b.surname, &b.name, b.id))
        });
        Ok(actors)
    }

    async fn get_actor(&self, id: i64) -> Result<Option<ActorSummary>, StoreError> {
        Ok(self.state.lock().actors.get(&id).cloned())
    }

    async fn filmography_of(&self, actor_id: i64) -> Result<Vec<MovieSummary>, StoreError> {
        let state = self.state.lock();
        let mut movies: Vec<MovieSummary> = state
            .links
            .iter()
            .filter(|&&(_, linked)| linked == actor_id)
            .filter_map(|(movie_id, _)| state.movies.get(movie_id).cloned())
            .collect();
        movies.sort_by(|a, b| crate::query::SortDirective::DateDesc.compare(a, b));
        Ok(movies)
    }

    async fn create_actor(&self, actor: &NewActor) -> Result<i64, StoreError> {
        let mut state = self.state.lock();
        let id = State::allocate(&mut state.next_actor_id);
        state.actors.insert(
            id,
            ActorSummary {
                id,
                name: actor.name.clone(),
                surname: actor.surname.clone(),
                gender: actor.gender.clone(),
                birth_date: actor.birth_date,
            },
        );
        Ok(id)
    }

    async fn update_actor(&self, id: i64, update: &ActorUpdate) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let Some(actor) = state.actors.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(name) = &update.name {
            actor.name = name.clone();
        }
        if let Some(surname) = &update.surname {
            actor.surname = surname.clone();
        }
        if let Some(gender) = &update.gender {
            actor.gender = gender.clone();
        }
        if update.birth_date.is_some() {
            actor.birth_date = update.birth_date;
        }
        Ok(true)
    }

    async fn delete_actor(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let removed = state.actors.remove(&id).is_some();
        state.links.retain(|&(_, actor_id)| actor_id != id);
        Ok(removed)
    }
}
