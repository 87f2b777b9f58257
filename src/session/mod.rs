//! # Session Manager
//!
//! Maps an opaque browser cookie to a server-side record holding the
//! authenticated identity snapshot and a one-shot flash message. Backed
//! by the same store as the credentials (SQLite table or MongoDB
//! collection), mirroring how the original deployment parked
//! express-session state in connect-pg-simple / connect-mongo.
//!
//! Sessions expire 24 hours after creation (absolute, non-sliding); an
//! expired record reads as absent and is lazily deleted. Nothing about an
//! in-flight exchange is persisted, so a crash mid-login simply leaves
//! the session anonymous.

pub mod mongo;
pub mod sqlite;


use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::models::Identity;

pub use mongo::MongoSessionStore;
pub use sqlite::SqliteSessionStore;

/// Name of the browser cookie carrying the session token
pub const SESSION_COOKIE: &str = "sid";

/// Absolute session lifetime; keep in sync with the cookie Max-Age below
pub const SESSION_TTL_HOURS: i64 = 24;

pub const AUTH_SUCCESS_MESSAGE: &str = "Authentication successful";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("session store error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("session serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One server-side session
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub token: String,
    pub user: Option<Identity>,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Raw persistence for session records. `load` must treat expired rows as
/// absent (implementations delete them on sight).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, SessionError>;
    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError>;
    async fn delete(&self, token: &str) -> Result<(), SessionError>;
}

/// The session lifecycle the handlers talk to:
/// Anonymous -> Authenticated on `start`, Anonymous-with-flash on
/// `mark_failed`, back to Anonymous on `destroy`.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Bind an identity snapshot to the browser's session and set the
    /// success flash. Re-authentication re-stamps the expiry.
    pub async fn start(
        &self,
        token: Option<String>,
        identity: Identity,
    ) -> Result<String, SessionError> {
        let token = token.unwrap_or_else(new_token);
        let record = SessionRecord {
            token: token.clone(),
            user: Some(identity),
            message: Some(AUTH_SUCCESS_MESSAGE.to_string()),
            expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
        };
        self.store.save(&record).await?;
        Ok(token)
    }

    /// Record a login failure as a flash message without creating or
    /// altering any identity binding.
    pub async fn mark_failed(
        &self,
        token: Option<String>,
        reason: &str,
    ) -> Result<String, SessionError> {
        let token = token.unwrap_or_else(new_token);
        let record = match self.store.load(&token).await? {
            Some(mut existing) => {
                existing.message = Some(reason.to_string());
                existing
            }
            None => SessionRecord {
                token: token.clone(),
                user: None,
                message: Some(reason.to_string()),
                expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
            },
        };
        self.store.save(&record).await?;
        Ok(token)
    }

    /// Return the bound identity (if any) and consume the flash message;
    /// the message is shown at most once.
    pub async fn read(
        &self,
        token: &str,
    ) -> Result<(Option<Identity>, Option<String>), SessionError> {
        let Some(mut record) = self.store.load(token).await? else {
            return Ok((None, None));
        };

        let message = record.message.take();
        if message.is_some() {
            self.store.save(&record).await?;
        }

        Ok((record.user, message))
    }

    /// Invalidate the session; subsequent reads return absent.
    pub async fn destroy(&self, token: &str) -> Result<(), SessionError> {
        self.store.delete(token).await
    }
}

fn new_token() -> String {
    Uuid::new_v4().to_string()
}

/// Extract the session token from the request's Cookie header
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Set-Cookie value binding the session token to the browser
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400",
        SESSION_COOKIE, token
    )
}

/// Set-Cookie value that drops the session cookie on logout
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
