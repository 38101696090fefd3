//! Error types for flockbot.

use std::time::Duration;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures of the network-facing collaborators (stream, post, search, rebroadcast).
///
/// These are at-most-once calls: the core reports a failure once and never
/// retries it.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Live stream unavailable: {reason}")]
    StreamUnavailable { reason: String },

    #[error("Failed to post update: {reason}")]
    SendFailed { reason: String },

    #[error("Search for '{query}' failed: {reason}")]
    SearchFailed { query: String, reason: String },

    #[error("Failed to rebroadcast status {id}: {reason}")]
    RebroadcastFailed { id: u64, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced to a component that made a request of another component.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Mailbox of {component} is closed")]
    MailboxClosed { component: &'static str },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
