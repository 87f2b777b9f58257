//! Authentication data models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::services::google::{GoogleProfile, TokenResponse};

/// A Google account mirrored locally with its current OAuth credentials
///
/// `subject_id` is the provider-assigned stable identifier and the only
/// uniqueness key. `refresh_token` is nullable because Google only issues
/// one on first consent; the store's merge rule keeps the stored value
/// when a later login omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_picture_url: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expiry: DateTime<Utc>,
    pub granted_scopes: Vec<String>,
}

impl Identity {
    /// Assemble the identity from a fresh token exchange and profile fetch.
    ///
    /// `token_expiry` becomes an absolute timestamp here; `expires_in` is
    /// relative to now. The id_token is deliberately never used as a
    /// refresh-token substitute.
    pub fn from_exchange(profile: &GoogleProfile, tokens: &TokenResponse) -> Self {
        Identity {
            subject_id: profile.id.clone(),
            display_name: profile.name.clone(),
            email: profile.email.clone(),
            profile_picture_url: profile.picture.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            token_expiry: Utc::now() + Duration::seconds(tokens.expires_in),
            granted_scopes: tokens
                .scope
                .as_deref()
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}
