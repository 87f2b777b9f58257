// MongoDB session store
//
// Same JSON-snapshot shape as the SQLite backend; one document per
// session keyed by the opaque token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::{self, doc},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use super::{SessionError, SessionRecord, SessionStore};
use crate::auth::models::Identity;

const COLLECTION: &str = "sessions";

#[derive(Debug, Clone)]
pub struct MongoSessionStore {
    db: Database,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionDoc {
    token: String,
    #[serde(default)]
    user_json: Option<String>,
    #[serde(default)]
    message: Option<String>,
    // BSON date, not an integer: the TTL index only reaps date fields
    expires_at: bson::DateTime,
}

impl MongoSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<SessionDoc> {
        self.db.collection::<SessionDoc>(COLLECTION)
    }

    pub async fn ensure_indexes(&self) -> Result<(), SessionError> {
        let token_index = IndexModel::builder()
            .keys(doc! { "token": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // Let the server reap abandoned sessions as soon as they expire;
        // the lazy delete in `load` only covers tokens that come back.
        let expiry_index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(0))
                    .build(),
            )
            .build();

        self.collection()
            .create_indexes([token_index, expiry_index])
            .await?;
        info!("Ensured token and expiry indexes on sessions");
        Ok(())
    }
}

fn into_record(doc: SessionDoc) -> Result<SessionRecord, SessionError> {
    let user = match doc.user_json {
        Some(json) => Some(serde_json::from_str::<Identity>(&json)?),
        None => None,
    };
    Ok(SessionRecord {
        token: doc.token,
        user,
        message: doc.message,
        expires_at: DateTime::from_timestamp_millis(doc.expires_at.timestamp_millis())
            .unwrap_or_default(),
    })
}

#[async_trait]
impl SessionStore for MongoSessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, SessionError> {
        let found = self.collection().find_one(doc! { "token": token }).await?;

        let Some(doc) = found else {
            return Ok(None);
        };

        if doc.expires_at.timestamp_millis() <= Utc::now().timestamp_millis() {
            self.delete(token).await?;
            return Ok(None);
        }

        into_record(doc).map(Some)
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let user_json = record
            .user
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let doc = SessionDoc {
            token: record.token.clone(),
            user_json,
            message: record.message.clone(),
            expires_at: bson::DateTime::from_millis(record.expires_at.timestamp_millis()),
        };

        self.collection()
            .replace_one(doc! { "token": &record.token }, &doc)
            .upsert(true)
            .await?;

        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        self.collection()
            .delete_one(doc! { "token": token })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mongodb::bson::Bson;

    fn sample_doc(expires_at: DateTime<Utc>) -> SessionDoc {
        SessionDoc {
            token: "t-1".to_string(),
            user_json: None,
            message: Some("Authentication successful".to_string()),
            expires_at: bson::DateTime::from_millis(expires_at.timestamp_millis()),
        }
    }

    #[test]
    fn test_expiry_serializes_as_bson_date() {
        // The TTL index only reaps BSON dates; an integer field would
        // never expire server-side.
        let doc = sample_doc(Utc::now() + Duration::hours(24));
        let serialized = bson::to_document(&doc).expect("serialize failed");

        assert!(matches!(
            serialized.get("expires_at"),
            Some(Bson::DateTime(_))
        ));
    }

    #[test]
    fn test_into_record_roundtrips_expiry() {
        let expires = Utc::now() + Duration::hours(24);
        let record = into_record(sample_doc(expires)).expect("conversion failed");

        assert_eq!(
            record.expires_at.timestamp_millis(),
            expires.timestamp_millis()
        );
        assert!(record.message.is_some());
        assert!(record.user.is_none());
    }
}
