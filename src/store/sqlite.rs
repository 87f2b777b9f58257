// SQLite credential store
//
// The merge rule lives entirely in the upsert statement:
// COALESCE(NULLIF(excluded.refresh_token, ''), refresh_token) keeps the
// stored refresh token when the new one is NULL or empty, and the whole
// INSERT .. ON CONFLICT runs atomically under SQLite's write lock.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::{CredentialStore, StoreError};
use crate::auth::models::Identity;

#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct IdentityRow {
    subject_id: String,
    display_name: Option<String>,
    email: Option<String>,
    profile_picture_url: Option<String>,
    access_token: String,
    refresh_token: Option<String>,
    token_expiry_ts: i64,
    granted_scopes: String,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            subject_id: row.subject_id,
            display_name: row.display_name,
            email: row.email,
            profile_picture_url: row.profile_picture_url,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            token_expiry: DateTime::from_timestamp(row.token_expiry_ts, 0).unwrap_or_default(),
            granted_scopes: split_scopes(&row.granted_scopes),
        }
    }
}

fn split_scopes(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn find_by_subject_id(
        &self,
        subject_id: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            "SELECT subject_id, display_name, email, profile_picture_url, access_token, \
             refresh_token, token_expiry_ts, granted_scopes \
             FROM identities WHERE subject_id = ?",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Identity::from))
    }

    async fn upsert(&self, identity: Identity) -> Result<Identity, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            INSERT INTO identities (
                subject_id, display_name, email, profile_picture_url,
                access_token, refresh_token, token_expiry_ts, granted_scopes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(subject_id) DO UPDATE SET
                display_name = excluded.display_name,
                email = excluded.email,
                profile_picture_url = excluded.profile_picture_url,
                access_token = excluded.access_token,
                refresh_token = COALESCE(NULLIF(excluded.refresh_token, ''), refresh_token),
                token_expiry_ts = excluded.token_expiry_ts,
                granted_scopes = excluded.granted_scopes,
                updated_at = strftime('%s','now')
            RETURNING subject_id, display_name, email, profile_picture_url,
                      access_token, refresh_token, token_expiry_ts, granted_scopes
            "#,
        )
        .bind(&identity.subject_id)
        .bind(&identity.display_name)
        .bind(&identity.email)
        .bind(&identity.profile_picture_url)
        .bind(&identity.access_token)
        .bind(&identity.refresh_token)
        .bind(identity.token_expiry.timestamp())
        .bind(identity.granted_scopes.join(" "))
        .fetch_one(&self.pool)
        .await?;

        debug!(subject_id = %row.subject_id, "Upserted identity");
        Ok(Identity::from(row))
    }
}
