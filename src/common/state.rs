// Application state shared across all modules

use std::sync::Arc;

use crate::services::GoogleService;
use crate::session::SessionManager;
use crate::store::CredentialStore;

/// Application state containing the configured services and stores
///
/// The credential and session stores are trait objects so the same
/// handlers run against either the relational or the document backend.
#[derive(Clone)]
pub struct AppState {
    pub google_service: Arc<GoogleService>,
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: SessionManager,
}
