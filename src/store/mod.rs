//! # Credential Store
//!
//! One row per external Google account, keyed by the provider-assigned
//! `subject_id`. Two interchangeable backends implement the same trait:
//! SQLite (relational) and MongoDB (document), selected by configuration.
//!
//! The upsert merge rule is the one invariant that must hold exactly:
//! access token, expiry and scopes are always overwritten, but a stored
//! refresh token is kept whenever the provider omits one on re-consent.
//! Both backends encode the rule as a single atomic statement so that
//! concurrent re-logins for the same identity cannot interleave a
//! read-modify-write and lose the token.

pub mod mongo;
pub mod sqlite;


use async_trait::async_trait;
use thiserror::Error;

use crate::auth::models::Identity;

pub use mongo::MongoCredentialStore;
pub use sqlite::SqliteCredentialStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("upsert returned no document")]
    MissingRow,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_subject_id(&self, subject_id: &str)
        -> Result<Option<Identity>, StoreError>;

    /// Insert-or-update keyed by `subject_id`.
    ///
    /// On update: `access_token`, `token_expiry`, `granted_scopes` and the
    /// profile fields are overwritten; `refresh_token` is overwritten only
    /// when the incoming value is non-empty, otherwise the stored value is
    /// preserved. Returns the row as persisted.
    async fn upsert(&self, identity: Identity) -> Result<Identity, StoreError>;
}
