//! Authentication routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /` - Login or profile view from session state
/// - `GET /auth/google` - Redirect to Google's consent screen
/// - `GET /api/auth/google/callback` - OAuth callback, always 302 to `/`
/// - `GET /logout` - Destroy session, 302 to `/`
pub fn auth_routes() -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/auth/google", get(handlers::google_oauth_start))
        .route("/api/auth/google/callback", get(handlers::google_oauth_callback))
        .route("/logout", get(handlers::logout))
}
