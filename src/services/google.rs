// src/services/google.rs
//
// OAuth 2.0 exchange client for Google: consent URL construction, the
// authorization-code-for-tokens exchange, and the userinfo profile fetch.
// Two outbound calls per login attempt, no retries; a transient provider
// failure surfaces immediately to the caller.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::common::GoogleConfig;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v1/userinfo";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("profile fetch failed: {0}")]
    ProfileFetch(String),

    #[error("request to Google timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Request(String),
}

/// Token endpoint response for the authorization_code grant
///
/// `refresh_token` is only present on first consent; Google omits it on
/// repeat authorizations for the same client.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

/// Userinfo endpoint response. `id` is the stable subject identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleService {
    config: GoogleConfig,
    client: Client,
    auth_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
}

impl GoogleService {
    pub fn new(config: GoogleConfig, client: Client) -> Self {
        Self {
            config,
            client,
            auth_endpoint: AUTH_ENDPOINT.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            userinfo_endpoint: USERINFO_ENDPOINT.to_string(),
        }
    }

    /// Point the service at non-default endpoints. Used by tests to talk
    /// to a local stand-in for Google.
    #[cfg(test)]
    pub fn with_endpoints(mut self, auth: &str, token: &str, userinfo: &str) -> Self {
        self.auth_endpoint = auth.to_string();
        self.token_endpoint = token.to_string();
        self.userinfo_endpoint = userinfo.to_string();
        self
    }

    /// Build the consent-screen redirect URL. Pure function of the
    /// configuration; `access_type=offline` and `prompt=consent` are
    /// requested so Google issues a refresh token on first consent.
    pub fn authorization_url(&self) -> String {
        let scope_param = self.config.scopes.join(" ");

        let url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_endpoint,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&scope_param)
        );

        debug!(scopes = %scope_param, "Generated Google OAuth authorization URL");
        url
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GoogleError> {
        let params = [
            ("code", code),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("redirect_uri", &self.config.redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(GoogleError::Exchange(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        // A success body without access_token is still a failed exchange
        let token_response = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| GoogleError::Exchange(format!("malformed token response: {}", e)))?;

        info!(
            refresh_token_present = token_response.refresh_token.is_some(),
            "Successfully exchanged authorization code for tokens"
        );
        Ok(token_response)
    }

    /// Fetch the user profile with a bearer access token
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile, GoogleError> {
        let response = self
            .client
            .get(&self.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Profile fetch failed");
            return Err(GoogleError::ProfileFetch(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let profile = response
            .json::<GoogleProfile>()
            .await
            .map_err(|e| GoogleError::ProfileFetch(format!("malformed profile response: {}", e)))?;

        debug!(subject_id = %profile.id, "Fetched Google profile");
        Ok(profile)
    }
}

fn map_transport_error(e: reqwest::Error) -> GoogleError {
    if e.is_timeout() {
        GoogleError::Timeout
    } else {
        GoogleError::Request(e.to_string())
    }
}
