// SQLite session store
//
// The identity snapshot travels as a JSON column so the sessions table
// stays schema-stable regardless of what the snapshot grows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::{SessionError, SessionRecord, SessionStore};
use crate::auth::models::Identity;

#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SessionRow {
    token: String,
    user_json: Option<String>,
    message: Option<String>,
    expires_at_ts: i64,
}

impl SessionRow {
    fn into_record(self) -> Result<SessionRecord, SessionError> {
        let user = match self.user_json {
            Some(json) => Some(serde_json::from_str::<Identity>(&json)?),
            None => None,
        };
        Ok(SessionRecord {
            token: self.token,
            user,
            message: self.message,
            expires_at: DateTime::from_timestamp(self.expires_at_ts, 0).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, SessionError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT token, user_json, message, expires_at_ts FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if row.expires_at_ts <= Utc::now().timestamp() {
            self.delete(token).await?;
            return Ok(None);
        }

        row.into_record().map(Some)
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let user_json = record
            .user
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT OR REPLACE INTO sessions (token, user_json, message, expires_at_ts) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&record.token)
        .bind(user_json)
        .bind(&record.message)
        .bind(record.expires_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
