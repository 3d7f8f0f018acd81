#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use movie_catalog::{
    AppConfig, AppState, create_router,
    error::StoreError,
    models::{
        ActorSummary, ActorUpdate, Identity, MovieSummary, MovieUpdate, NewActor, NewMovie,
        RefreshGrant,
    },
    query::MovieQuery,
    repository::{CatalogStore, CredentialStore, MemoryRepository},
    token::TokenService,
};
use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

// --- Catalog wrapper ---

/// Wraps the memory store, counting every call. Can fail the movie listing or the dependent
/// cast/filmography lookups.
#[derive(Default)]
pub struct InstrumentedCatalog {
    pub inner: MemoryRepository,
    pub calls: AtomicUsize,
    pub fail_listing: AtomicBool,
    pub fail_dependents: AtomicBool,
}

impl InstrumentedCatalog {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn dependent_failure(&self) -> Option<StoreError> {
        failure_if(&self.fail_dependents)
    }
}

fn failure_if(switch: &AtomicBool) -> Option<StoreError> {
    switch
        .load(Ordering::SeqCst)
        .then(|| StoreError::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl CatalogStore for InstrumentedCatalog {
    async fn list_movies(&self, query: &MovieQuery) -> Result<Vec<MovieSummary>, StoreError> {
        self.hit();
        match failure_if(&self.fail_listing) {
            Some(e) => Err(e),
            None => self.inner.list_movies(query).await,
        }
    }
    async fn get_movie(&self, id: i64) -> Result<Option<MovieSummary>, StoreError> {
        self.hit();
        self.inner.get_movie(id).await
    }
    async fn cast_of(&self, movie_id: i64) -> Result<Vec<ActorSummary>, StoreError> {
        self.hit();
        match self.dependent_failure() {
            Some(e) => Err(e),
            None => self.inner.cast_of(movie_id).await,
        }
    }
    async fn create_movie(&self, movie: &NewMovie) -> Result<i64, StoreError> {
        self.hit();
        self.inner.create_movie(movie).await
    }
    async fn update_movie(&self, id: i64, update: &MovieUpdate) -> Result<bool, StoreError> {
        self.hit();
        self.inner.update_movie(id, update).await
    }
    async fn delete_movie(&self, id: i64) -> Result<bool, StoreError> {
        self.hit();
        self.inner.delete_movie(id).await
    }
    async fn link_actor(&self, movie_id: i64, actor_id: i64) -> Result<(), StoreError> {
        self.hit();
        self.inner.link_actor(movie_id, actor_id).await
    }
    async fn unlink_actor(&self, movie_id: i64, actor_id: i64) -> Result<bool, StoreError> {
        self.hit();
        self.inner.unlink_actor(movie_id, actor_id).await
    }
    async fn list_actors(&self) -> Result<Vec<ActorSummary>, StoreError> {
        self.hit();
        self.inner.list_actors().await
    }
    async fn get_actor(&self, id: i64) -> Result<Option<ActorSummary>, StoreError> {
        self.hit();
        self.inner.get_actor(id).await
    }
    async fn filmography_of(&self, actor_id: i64) -> Result<Vec<MovieSummary>, StoreError> {
        self.hit();
        match self.dependent_failure() {
            Some(e) => Err(e),
            None => self.inner.filmography_of(actor_id).await,
        }
    }
    async fn create_actor(&self, actor: &NewActor) -> Result<i64, StoreError> {
        self.hit();
        self.inner.create_actor(actor).await
    }
    async fn update_actor(&self, id: i64, update: &ActorUpdate) -> Result<bool, StoreError> {
        self.hit();
        self.inner.update_actor(id, update).await
    }
    async fn delete_actor(&self, id: i64) -> Result<bool, StoreError> {
        self.hit();
        self.inner.delete_actor(id).await
    }
}

// --- Credential wrapper ---

/// The memory credential store, with a switch that makes saving refresh grants fail.
#[derive(Default)]
pub struct InstrumentedCredentials {
    pub inner: MemoryRepository,
    pub refuse_grants: AtomicBool,
}

#[async_trait]
impl CredentialStore for InstrumentedCredentials {
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i64, StoreError> {
        self.inner.create_user(login, password_hash, is_admin).await
    }
    async fn get_user_by_login(&self, login: &str) -> Result<Option<Identity>, StoreError> {
        self.inner.get_user_by_login(login).await
    }
    async fn get_user(&self, id: i64) -> Result<Option<Identity>, StoreError> {
        self.inner.get_user(id).await
    }
    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        self.inner.delete_user(id).await
    }
    async fn save_refresh_grant(&self, grant: RefreshGrant) -> Result<(), StoreError> {
        match failure_if(&self.refuse_grants) {
            Some(e) => Err(e),
            None => self.inner.save_refresh_grant(grant).await,
        }
    }
    async fn take_refresh_grant(&self, digest: &str) -> Result<Option<RefreshGrant>, StoreError> {
        self.inner.take_refresh_grant(digest).await
    }
    async fn revoke_refresh_grants(&self, user_id: i64) -> Result<u64, StoreError> {
        self.inner.revoke_refresh_grants(user_id).await
    }
}

// --- App scaffolding ---

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub catalog: Arc<InstrumentedCatalog>,
    pub credentials: Arc<InstrumentedCredentials>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig {
            jwt_secret: TEST_SECRET.to_string(),
            ..AppConfig::default()
        })
    }

    pub fn with_config(config: AppConfig) -> Self {
        let catalog = Arc::new(InstrumentedCatalog::default());
        let credentials = Arc::new(InstrumentedCredentials::default());
        let tokens = Arc::new(TokenService::new(&config.jwt_secret).unwrap());

        let state = AppState {
            credentials: credentials.clone(),
            catalog: catalog.clone(),
            tokens,
            config,
        };

        Self {
            router: create_router(state.clone()),
            state,
            catalog,
            credentials,
        }
    }

    /// An `AccessToken` cookie pair carrying `token`, encoded the way the session cookie is.
    pub fn access_cookie(token: &str) -> String {
        format!("AccessToken=Bearer%20{token}")
    }

    /// An `Authorization` header value for a freshly issued token.
    pub fn bearer(&self, user_id: i64, is_admin: bool) -> String {
        format!("Bearer {}", self.state.tokens.issue(user_id, is_admin).unwrap())
    }

    /// Seeds three movies and two actors directly through the store.
    ///
    /// | id | name        | rating | release    | cast          |
    /// |----|-------------|--------|------------|---------------|
    /// | 1  | The Matrix  | 9      | 1999-03-31 | Keanu Reeves  |
    /// | 2  | Heat        | 8      | none       | Al Pacino     |
    /// | 3  | John Wick   | 8      | 2014-10-24 | Keanu Reeves  |
    pub async fn seed(&self) {
        let store = &self.catalog.inner;
        let keanu = store
            .create_actor(&NewActor {
                name: "Keanu".into(),
                surname: "Reeves".into(),
                gender: "male".into(),
                birth_date: chrono::NaiveDate::from_ymd_opt(1964, 9, 2),
            })
            .await
            .unwrap();
        let pacino = store
            .create_actor(&NewActor {
                name: "Al".into(),
                surname: "Pacino".into(),
                gender: "male".into(),
                birth_date: None,
            })
            .await
            .unwrap();

        for (name, rating, date, cast) in [
            ("The Matrix", 9, chrono::NaiveDate::from_ymd_opt(1999, 3, 31), keanu),
            ("Heat", 8, None, pacino),
            ("John Wick", 8, chrono::NaiveDate::from_ymd_opt(2014, 10, 24), keanu),
        ] {
            store
                .create_movie(&NewMovie {
                    name: name.into(),
                    description: String::new(),
                    release_date: date,
                    rating,
                    actor_ids: vec![cast],
                })
                .await
                .unwrap();
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` pairs from every `Set-Cookie` header, ready to send back in a `Cookie`
    /// header.
    pub fn cookie_pairs(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(str::to_string)
            .collect()
    }

    /// The decoded value of the named cookie, if the response set it.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| axum_extra::extract::cookie::Cookie::parse_encoded(v.to_string()).ok())
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
    }
}

// --- Request builders ---

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_as(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

pub fn json(method: &str, uri: &str, authorization: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(authorization) = authorization {
        builder = builder.header(header::AUTHORIZATION, authorization);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn with_cookies(method: &str, uri: &str, cookies: &[String]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookies.join("; "))
        .body(Body::empty())
        .unwrap()
}

pub fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap().to_string())
        .collect()
}
