// MongoDB credential store
//
// A single find_one_and_update with upsert carries the merge rule: the
// $set document simply omits refresh_token when the incoming value is
// absent or empty, so the stored field is never touched in that case.

use async_trait::async_trait;
use chrono::DateTime;
use mongodb::{
    bson::doc,
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CredentialStore, StoreError};
use crate::auth::models::Identity;

const COLLECTION: &str = "identities";

#[derive(Debug, Clone)]
pub struct MongoCredentialStore {
    db: Database,
}

#[derive(Debug, Serialize, Deserialize)]
struct IdentityDoc {
    subject_id: String,
    display_name: Option<String>,
    email: Option<String>,
    profile_picture_url: Option<String>,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    token_expiry_ts: i64,
    #[serde(default)]
    granted_scopes: Vec<String>,
}

impl From<IdentityDoc> for Identity {
    fn from(d: IdentityDoc) -> Self {
        Identity {
            subject_id: d.subject_id,
            display_name: d.display_name,
            email: d.email,
            profile_picture_url: d.profile_picture_url,
            access_token: d.access_token,
            refresh_token: d.refresh_token,
            token_expiry: DateTime::from_timestamp(d.token_expiry_ts, 0).unwrap_or_default(),
            granted_scopes: d.granted_scopes,
        }
    }
}

impl MongoCredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<IdentityDoc> {
        self.db.collection::<IdentityDoc>(COLLECTION)
    }

    /// Enforce at-most-one document per subject_id. Called once at startup;
    /// a failure here is fatal since the upsert depends on the constraint.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let subject_index = IndexModel::builder()
            .keys(doc! { "subject_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection().create_index(subject_index).await?;
        info!("Ensured unique index on identities.subject_id");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MongoCredentialStore {
    async fn find_by_subject_id(
        &self,
        subject_id: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let found = self
            .collection()
            .find_one(doc! { "subject_id": subject_id })
            .await?;

        Ok(found.map(Identity::from))
    }

    async fn upsert(&self, identity: Identity) -> Result<Identity, StoreError> {
        let mut set = doc! {
            "subject_id": &identity.subject_id,
            "display_name": identity.display_name.clone(),
            "email": identity.email.clone(),
            "profile_picture_url": identity.profile_picture_url.clone(),
            "access_token": &identity.access_token,
            "token_expiry_ts": identity.token_expiry.timestamp(),
            "granted_scopes": identity.granted_scopes.clone(),
        };

        // Only touch refresh_token when the provider actually issued one
        if let Some(refresh_token) = identity.refresh_token.as_deref() {
            if !refresh_token.is_empty() {
                set.insert("refresh_token", refresh_token);
            }
        }

        let updated = self
            .collection()
            .find_one_and_update(
                doc! { "subject_id": &identity.subject_id },
                doc! { "$set": set },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(StoreError::MissingRow)?;

        debug!(subject_id = %updated.subject_id, "Upserted identity");
        Ok(Identity::from(updated))
    }
}
