//! Service account credential encoding
//!
//! `GOOGLE_CREDENTIALS` carries the service account key file as base64 of
//! its minified JSON, which fits in a single environment variable.

use crate::error::{ChatsdjError, Result};
use base64::Engine as _;
use std::path::Path;

/// Encodes a service account JSON file for `GOOGLE_CREDENTIALS`
///
/// # Arguments
///
/// * `path` - Path to the service account JSON file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid JSON
pub fn encode_credentials(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ChatsdjError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    encode_credentials_json(&contents)
}

/// Minifies a JSON document and encodes it as standard base64
///
/// # Examples
///
/// ```
/// use chatsdj::commands::credentials::encode_credentials_json;
///
/// let encoded = encode_credentials_json("{ \"a\": 1 }").unwrap();
/// assert_eq!(encoded, "eyJhIjoxfQ==");
/// ```
pub fn encode_credentials_json(contents: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    let minified = serde_json::to_string(&value)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(minified))
}
