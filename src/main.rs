use movie_catalog::{
    AppState,
    config::{AppConfig, BootstrapAdmin, Env},
    create_router, password,
    repository::{CatalogState, CredentialState, CredentialStore, PostgresRepository},
    token::TokenService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, connects and migrates the database, builds the
/// token service and serves the router. Any startup failure is fatal.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging: RUST_LOG wins, otherwise crate-level debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "movie_catalog=debug,tower_http=info,axum=trace".into());

    // 3. Pretty output locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Token service, built before anything can serve a request.
    let tokens = Arc::new(
        TokenService::new(&config.jwt_secret).expect("FATAL: signing secret rejected"),
    );

    // 5. Database
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL or DB_* settings.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: database migration failed");

    let repo = Arc::new(PostgresRepository::new(pool));
    let credentials = repo.clone() as CredentialState;
    let catalog = repo as CatalogState;

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap_admin(&credentials, admin)
            .await
            .expect("FATAL: could not create bootstrap administrator");
    }

    // 6. Router and server
    let bind_addr = config.bind_addr;
    let app = create_router(AppState {
        credentials,
        catalog,
        tokens,
        config,
    });

    let listener = TcpListener::bind(bind_addr)
        .await
        .expect("FATAL: could not bind listener");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: server terminated");
}

/// Creates the configured administrator unless the login already exists.
async fn bootstrap_admin(
    credentials: &CredentialState,
    admin: &BootstrapAdmin,
) -> Result<(), Box<dyn std::error::Error>> {
    if credentials.get_user_by_login(&admin.login).await?.is_some() {
        tracing::info!(login = %admin.login, "bootstrap administrator already present");
        return Ok(());
    }

    let password_hash = password::hash(admin.password.clone()).await?;
    let id = credentials
        .create_user(&admin.login, &password_hash, true)
        .await?;
    tracing::info!(subject_id = id, "bootstrap administrator created");
    Ok(())
}
