// src/services/mod.rs
//
// Outbound-provider clients shared across domain modules

pub mod google;

// Re-export commonly used types for convenience
pub use google::GoogleService;
