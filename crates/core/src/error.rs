//! Error types for the attachkit domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Note that attachment bookkeeping never fails: duplicate adds, removal of
//! absent ids and exceeded limits are normalized or reported through events.
//! These errors cover the I/O edges (resolution, discovery, configuration).

use thiserror::Error;

/// The top-level error type for all attachkit operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Resolver errors ---
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    // --- Discovery errors ---
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("Failed to read '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}

#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("Failed to list '{path}': {reason}")]
    ReadDir { path: String, reason: String },
}
