//! Authentication handlers
//!
//! The callback path never answers the browser with anything but a 302
//! to `/`: every provider or store failure is logged, converted into the
//! session flash message, and shown on the next page render.

use axum::{
    extract::{Extension, Query},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::views;
use crate::auth::models::Identity;
use crate::common::{safe_email_log, safe_token_log, ApiError, AppState};
use crate::session;

/// GET / - Render the login or profile view from current session state
pub async fn index(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let state = state_lock.read().await.clone();

    let (user, message) = match session::token_from_headers(&headers) {
        Some(token) => state.sessions.read(&token).await?,
        None => (None, None),
    };

    debug!(
        authenticated = user.is_some(),
        has_flash = message.is_some(),
        "Rendering index"
    );

    Ok(Html(views::render_index(user.as_ref(), message.as_deref())))
}

/// GET /auth/google - Redirect the browser to Google's consent screen
pub async fn google_oauth_start(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await;
    let auth_url = state.google_service.authorization_url();

    info!("Redirecting to Google OAuth consent screen");
    found(&auth_url)
}

/// GET /api/auth/google/callback - Handle the OAuth callback from Google
///
/// Exchange the code, fetch the profile, upsert the identity, bind the
/// session. Each stage runs only if the previous one succeeded; the first
/// failure short-circuits into a flash message and the usual redirect.
pub async fn google_oauth_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();
    let token = session::token_from_headers(&headers);

    // Consent-screen denial or other provider-reported error
    if let Some(provider_error) = params.get("error") {
        error!(oauth_error = %provider_error, "Google OAuth returned error");
        let reason = format!("Authentication failed: {}", provider_error);
        return fail_redirect(&state.sessions, token, &reason).await;
    }

    let Some(code) = params.get("code") else {
        warn!("OAuth callback without authorization code");
        return fail_redirect(
            &state.sessions,
            token,
            "Authentication failed: missing authorization code",
        )
        .await;
    };

    info!("Received OAuth callback with authorization code");

    let tokens = match state.google_service.exchange_code(code).await {
        Ok(tokens) => tokens,
        Err(e) => {
            error!(error = %e, "Failed to exchange authorization code for tokens");
            let reason = format!("Authentication failed: {}", e);
            return fail_redirect(&state.sessions, token, &reason).await;
        }
    };

    let profile = match state.google_service.fetch_profile(&tokens.access_token).await {
        Ok(profile) => profile,
        Err(e) => {
            error!(error = %e, "Failed to fetch Google profile");
            let reason = format!("Authentication failed: {}", e);
            return fail_redirect(&state.sessions, token, &reason).await;
        }
    };

    debug!(
        subject_id = %profile.id,
        email = %profile.email.as_deref().map(safe_email_log).unwrap_or_default(),
        access_token = %safe_token_log(&tokens.access_token),
        "Exchanged code and fetched profile, upserting identity"
    );

    let identity = match state
        .credentials
        .upsert(Identity::from_exchange(&profile, &tokens))
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            error!(error = %e, subject_id = %profile.id, "Failed to persist identity");
            return fail_redirect(
                &state.sessions,
                token,
                "Authentication failed: could not save account",
            )
            .await;
        }
    };

    info!(
        subject_id = %identity.subject_id,
        refresh_token_stored = identity.refresh_token.is_some(),
        "Identity persisted, binding session"
    );

    match state.sessions.start(token, identity).await {
        Ok(token) => redirect_with_cookie(&session::session_cookie(&token)),
        Err(e) => {
            // The session store being down must not break the redirect
            // invariant; the user just lands back on the login view.
            error!(error = %e, "Failed to bind session after login");
            found("/")
        }
    }
}

/// GET /logout - Destroy the session and drop the cookie
pub async fn logout(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();

    if let Some(token) = session::token_from_headers(&headers) {
        state.sessions.destroy(&token).await?;
        info!("Session destroyed on logout");
    }

    redirect_with_cookie(&session::clear_session_cookie())
}

// Record the failure flash and redirect. The flash itself is best-effort:
// if the session store cannot take the write, the browser still gets its
// 302 to `/` and only the message is lost.
async fn fail_redirect(
    sessions: &session::SessionManager,
    token: Option<String>,
    reason: &str,
) -> Result<Response, ApiError> {
    match sessions.mark_failed(token, reason).await {
        Ok(token) => redirect_with_cookie(&session::session_cookie(&token)),
        Err(e) => {
            error!(error = %e, "Failed to record login failure in session store");
            found("/")
        }
    }
}

// The browser always ends up back at `/` with a plain 302; axum's
// Redirect would answer 303.
fn found(location: &str) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(location)
        .map_err(|e| ApiError::InternalServer(format!("invalid redirect target: {}", e)))?;

    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(header::LOCATION, value);
    Ok(response)
}

fn redirect_with_cookie(cookie: &str) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::InternalServer(format!("invalid cookie header: {}", e)))?;

    let mut response = found("/")?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(response)
}
