//! # Auth Module
//!
//! This module handles the sign-in flow end to end:
//! - Redirect to Google's consent screen
//! - OAuth callback: code exchange, profile fetch, identity upsert
//! - Session binding and logout
//! - The single HTML page rendered from session state

pub mod handlers;
pub mod models;
pub mod routes;
pub mod views;

#[cfg(test)]
mod tests;

pub use models::Identity;
pub use routes::auth_routes;
