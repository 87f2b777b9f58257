//! Tests for auth module
//!
//! These tests verify the pure pieces of the sign-in flow:
//! - Authorization URL construction
//! - Token response parsing
//! - Identity assembly from exchange results
//! - Page rendering from session state
//! - Session cookie plumbing

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::extract::{Extension, Query};
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
    use reqwest::Client;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::RwLock;

    use crate::auth::handlers;
    use crate::auth::models::Identity;
    use crate::auth::views::render_index;
    use crate::common::{migrations, AppState, GoogleConfig};
    use crate::services::google::{GoogleService, TokenResponse};
    use crate::session;
    use crate::session::{
        SessionError, SessionManager, SessionRecord, SessionStore, SqliteSessionStore,
    };
    use crate::store::{CredentialStore, SqliteCredentialStore};
    use chrono::{Duration, Utc};

    fn test_config() -> GoogleConfig {
        GoogleConfig {
            client_id: "client-123.apps.googleusercontent.com".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:3000/api/auth/google/callback".to_string(),
            scopes: vec!["profile".to_string(), "email".to_string()],
        }
    }

    fn test_identity() -> Identity {
        Identity {
            subject_id: "g-123".to_string(),
            display_name: Some("Test User".to_string()),
            email: Some("test@example.com".to_string()),
            profile_picture_url: Some("https://example.com/avatar.jpg".to_string()),
            access_token: "a1".to_string(),
            refresh_token: Some("r1".to_string()),
            token_expiry: Utc::now() + Duration::hours(1),
            granted_scopes: vec!["profile".to_string(), "email".to_string()],
        }
    }

    #[test]
    fn test_authorization_url_carries_oauth_parameters() {
        let service = GoogleService::new(test_config(), Client::new());
        let url = service.authorization_url();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123.apps.googleusercontent.com"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=profile%20email"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Fgoogle%2Fcallback"
        ));
    }

    #[test]
    fn test_token_response_parses_first_consent() {
        let body = r#"{
            "access_token": "ya29.a0",
            "refresh_token": "1//0g",
            "expires_in": 3599,
            "token_type": "Bearer",
            "scope": "profile email"
        }"#;

        let parsed: TokenResponse = serde_json::from_str(body).expect("parse failed");
        assert_eq!(parsed.access_token, "ya29.a0");
        assert_eq!(parsed.refresh_token, Some("1//0g".to_string()));
        assert_eq!(parsed.expires_in, 3599);
    }

    #[test]
    fn test_token_response_tolerates_missing_refresh_token() {
        // Repeat consent: Google omits refresh_token entirely
        let body = r#"{"access_token": "ya29.a0", "expires_in": 3599, "token_type": "Bearer"}"#;

        let parsed: TokenResponse = serde_json::from_str(body).expect("parse failed");
        assert!(parsed.refresh_token.is_none());
        assert!(parsed.scope.is_none());
    }

    #[test]
    fn test_token_response_rejects_missing_access_token() {
        let body = r#"{"expires_in": 3599, "token_type": "Bearer"}"#;

        let parsed = serde_json::from_str::<TokenResponse>(body);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_identity_from_exchange_splits_scopes() {
        let profile: crate::services::google::GoogleProfile = serde_json::from_str(
            r#"{"id": "g-123", "name": "Test User", "email": "test@example.com",
                "picture": "https://example.com/avatar.jpg"}"#,
        )
        .expect("profile parse failed");
        let tokens = TokenResponse {
            access_token: "a1".to_string(),
            refresh_token: None,
            expires_in: 3600,
            token_type: Some("Bearer".to_string()),
            scope: Some("profile email".to_string()),
        };

        let identity = Identity::from_exchange(&profile, &tokens);
        assert_eq!(identity.subject_id, "g-123");
        assert_eq!(identity.granted_scopes, vec!["profile", "email"]);
        assert!(identity.refresh_token.is_none());
        assert!(identity.token_expiry > Utc::now());
    }

    #[test]
    fn test_render_index_shows_login_view_when_anonymous() {
        let html = render_index(None, None);

        assert!(html.contains("Sign in with Google"));
        assert!(html.contains(r#"href="/auth/google""#));
        assert!(!html.contains("Sign Out"));
    }

    #[test]
    fn test_render_index_shows_profile_view_when_authenticated() {
        let identity = test_identity();
        let html = render_index(Some(&identity), Some("Authentication successful"));

        assert!(html.contains("Test User"));
        assert!(html.contains("test@example.com"));
        assert!(html.contains("https://example.com/avatar.jpg"));
        assert!(html.contains("Sign Out"));
        assert!(html.contains("success-message"));
        assert!(html.contains("Authentication successful"));
    }

    #[test]
    fn test_render_index_flags_failure_flash_as_error() {
        let html = render_index(None, Some("Authentication failed: invalid_grant"));

        assert!(html.contains("error-message"));
        assert!(html.contains("Authentication failed: invalid_grant"));
        // Still the login view
        assert!(html.contains("Sign in with Google"));
    }

    #[test]
    fn test_render_index_escapes_profile_fields() {
        let mut identity = test_identity();
        identity.display_name = Some("<script>alert(1)</script>".to_string());

        let html = render_index(Some(&identity), None);
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_token_from_headers_finds_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sid=abc-123; lang=en"),
        );

        assert_eq!(
            session::token_from_headers(&headers),
            Some("abc-123".to_string())
        );
    }

    #[test]
    fn test_token_from_headers_without_cookie() {
        let headers = HeaderMap::new();
        assert!(session::token_from_headers(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert!(session::token_from_headers(&headers).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session::session_cookie("abc-123");
        assert_eq!(
            cookie,
            "sid=abc-123; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400"
        );

        let cleared = session::clear_session_cookie();
        assert!(cleared.starts_with("sid=;"));
        assert!(cleared.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_exchange_code_surfaces_transport_failure() {
        // Nothing listens on this port; the exchange must fail loudly
        // instead of being swallowed.
        let service = GoogleService::new(test_config(), Client::new()).with_endpoints(
            "http://127.0.0.1:9/auth",
            "http://127.0.0.1:9/token",
            "http://127.0.0.1:9/userinfo",
        );

        let result = service.exchange_code("bad-code").await;
        assert!(result.is_err());
    }

    // ------------------------------------------------------------------
    // Handler-level callback tests
    // ------------------------------------------------------------------

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        migrations::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        pool
    }

    async fn test_state(google: GoogleService) -> (Arc<RwLock<AppState>>, SqlitePool) {
        let pool = test_pool().await;
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(SqliteCredentialStore::new(pool.clone()));
        let sessions = SessionManager::new(Arc::new(SqliteSessionStore::new(pool.clone())));
        let state = AppState {
            google_service: Arc::new(google),
            credentials,
            sessions,
        };
        (Arc::new(RwLock::new(state)), pool)
    }

    /// Minimal token endpoint that rejects every code the way Google
    /// rejects a bad or expired one.
    async fn spawn_rejecting_token_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind stub endpoint");
        let addr = listener.local_addr().expect("no local addr");

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let body =
                        r#"{"error":"invalid_grant","error_description":"Malformed auth code."}"#;
                    let response = format!(
                        "HTTP/1.1 400 Bad Request\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    struct FailingSessionStore;

    #[async_trait]
    impl SessionStore for FailingSessionStore {
        async fn load(&self, _token: &str) -> Result<Option<SessionRecord>, SessionError> {
            Err(SessionError::Sqlx(sqlx::Error::PoolClosed))
        }

        async fn save(&self, _record: &SessionRecord) -> Result<(), SessionError> {
            Err(SessionError::Sqlx(sqlx::Error::PoolClosed))
        }

        async fn delete(&self, _token: &str) -> Result<(), SessionError> {
            Err(SessionError::Sqlx(sqlx::Error::PoolClosed))
        }
    }

    #[tokio::test]
    async fn test_rejected_code_flashes_failure_and_redirects_home() {
        let base = spawn_rejecting_token_endpoint().await;
        let service = GoogleService::new(test_config(), Client::new()).with_endpoints(
            &format!("{}/auth", base),
            &format!("{}/token", base),
            &format!("{}/userinfo", base),
        );
        let (state, pool) = test_state(service).await;

        let mut params = HashMap::new();
        params.insert("code".to_string(), "rejected-code".to_string());

        let response = handlers::google_oauth_callback(
            Extension(state.clone()),
            HeaderMap::new(),
            Query(params),
        )
        .await
        .expect("handler errored");

        // Always a 302 back to /
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/")
        );

        // The failed exchange short-circuits before the upsert
        let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM identities")
            .fetch_one(&pool)
            .await
            .expect("count query failed");
        assert_eq!(rows, 0);

        // The failure flash is waiting in the session bound by the cookie
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("no session cookie set");
        let token = cookie
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix("sid="))
            .expect("malformed session cookie");

        let sessions = state.read().await.sessions.clone();
        let (user, message) = sessions.read(token).await.expect("session read failed");
        assert!(user.is_none());
        assert!(message
            .expect("failure flash missing")
            .starts_with("Authentication failed"));
    }

    #[tokio::test]
    async fn test_callback_still_redirects_when_session_store_is_down() {
        let pool = test_pool().await;
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(SqliteCredentialStore::new(pool.clone()));
        let sessions = SessionManager::new(Arc::new(FailingSessionStore));
        let state = Arc::new(RwLock::new(AppState {
            google_service: Arc::new(GoogleService::new(test_config(), Client::new())),
            credentials,
            sessions,
        }));

        let mut params = HashMap::new();
        params.insert("error".to_string(), "access_denied".to_string());

        let response =
            handlers::google_oauth_callback(Extension(state), HeaderMap::new(), Query(params))
                .await
                .expect("session store failure must not surface as an error response");

        // Flash is lost but the redirect invariant holds
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/")
        );
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
