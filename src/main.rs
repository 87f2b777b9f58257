// src/main.rs
use axum::{extract::Extension, Router};
use dotenv::dotenv;
use mongodb::Client as MongoClient;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::Duration;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod common;
mod services;
mod session;
mod store;

use common::{AppConfig, AppState, StoreBackend};
use services::GoogleService;
use session::{MongoSessionStore, SessionManager, SessionStore, SqliteSessionStore};
use store::{CredentialStore, MongoCredentialStore, SqliteCredentialStore};

// Outbound calls to Google are bounded so a hung provider cannot pin a
// request forever.
const PROVIDER_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env()?;
    info!(backend = ?config.backend, "Configuration loaded");

    // ========================================================================
    // STORE SETUP
    // ========================================================================

    // A store-initialization failure here is fatal; the service cannot
    // serve correctly without its store.
    let (credentials, session_store): (Arc<dyn CredentialStore>, Arc<dyn SessionStore>) =
        match config.backend {
            StoreBackend::Sqlite => {
                if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
                    let path_without_params = path_part.split('?').next().unwrap_or("");
                    if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
                        let db_path = PathBuf::from(path_without_params);
                        if let Some(parent) = db_path.parent() {
                            if !parent.as_os_str().is_empty() {
                                tokio::fs::create_dir_all(parent).await?;
                            }
                        }
                    }
                }

                let connect_options =
                    SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
                let pool = SqlitePoolOptions::new()
                    .connect_with(connect_options)
                    .await?;

                common::migrations::run_migrations(&pool).await?;
                info!("SQLite store initialized");

                let credentials: Arc<dyn CredentialStore> =
                    Arc::new(SqliteCredentialStore::new(pool.clone()));
                let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(pool));
                (credentials, sessions)
            }
            StoreBackend::MongoDb => {
                let client = MongoClient::with_uri_str(&config.mongodb_uri).await?;
                let db = client.database(&config.mongodb_database);

                let credential_store = MongoCredentialStore::new(db.clone());
                credential_store.ensure_indexes().await?;

                let session_store = MongoSessionStore::new(db);
                session_store.ensure_indexes().await?;
                info!("MongoDB store initialized");

                let credentials: Arc<dyn CredentialStore> = Arc::new(credential_store);
                let sessions: Arc<dyn SessionStore> = Arc::new(session_store);
                (credentials, sessions)
            }
        };

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder()
        .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
        .build()?;

    let google_service = Arc::new(GoogleService::new(config.google.clone(), http_client));
    info!("GoogleService initialized");

    let sessions = SessionManager::new(session_store);
    info!("SessionManager initialized");

    // ========================================================================
    // APPLICATION STATE AND ROUTER
    // ========================================================================

    let app_state = AppState {
        google_service,
        credentials,
        sessions,
    };

    let shared = Arc::new(RwLock::new(app_state));

    let app = Router::new()
        .merge(auth::auth_routes())
        .layer(Extension(shared))
        .layer(CorsLayer::new())
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
