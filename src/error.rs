//! Error types for chatsdj
//!
//! This module defines all error types used throughout the bot,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for chatsdj operations
///
/// This enum encompasses the failures that can occur while loading
/// configuration, talking to the completion API, talking to Slack,
/// fetching personas, and verifying inbound webhook requests.
#[derive(Error, Debug)]
pub enum ChatsdjError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion API errors (non-success status, missing body, etc.)
    #[error("Completion API error: {0}")]
    Completion(String),

    /// Stream or payload decoding errors (malformed frame, unexpected shape)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Slack Web API errors (transport failure or `ok: false`)
    #[error("Slack API error: {0}")]
    Slack(String),

    /// Persona source errors (authentication, spreadsheet fetch)
    #[error("Persona source error: {0}")]
    Persona(String),

    /// Inbound request signature errors
    #[error("Signature error: {0}")]
    Signature(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for chatsdj operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
