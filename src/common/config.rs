// Application configuration
//
// All environment reads happen here, once, at startup. Handlers and
// services receive these structs explicitly instead of consulting
// process-wide state.

use anyhow::{bail, Context};
use std::env;

/// Which persistence backend holds identities and sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    MongoDb,
}

impl StoreBackend {
    pub fn from_env() -> anyhow::Result<Self> {
        let raw = env::var("STORE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());
        match raw.to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "mongodb" | "mongo" => Ok(StoreBackend::MongoDb),
            other => bail!("unknown STORE_BACKEND '{}' (expected sqlite or mongodb)", other),
        }
    }
}

/// Google OAuth client configuration
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let client_id =
            env::var("GOOGLE_CLIENT_ID").context("GOOGLE_CLIENT_ID must be set")?;
        let client_secret =
            env::var("GOOGLE_CLIENT_SECRET").context("GOOGLE_CLIENT_SECRET must be set")?;
        let redirect_uri = env::var("GOOGLE_OAUTH_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:3000/api/auth/google/callback".to_string());
        let scopes = env::var("GOOGLE_OAUTH_SCOPES")
            .unwrap_or_else(|_| "profile email".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(GoogleConfig {
            client_id,
            client_secret,
            redirect_uri,
            scopes,
        })
    }
}

/// Top-level application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub backend: StoreBackend,
    pub database_url: String,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub google: GoogleConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let backend = StoreBackend::from_env()?;
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://signin.db".to_string());
        let mongodb_uri =
            env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let mongodb_database =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| "signin".to_string());
        let google = GoogleConfig::from_env()?;

        Ok(AppConfig {
            port,
            backend,
            database_url,
            mongodb_uri,
            mongodb_database,
            google,
        })
    }
}
