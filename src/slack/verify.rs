//! Slack request signature verification
//!
//! Implements the `v0` signing scheme: an HMAC-SHA256 over
//! `v0:{timestamp}:{body}` keyed with the app's signing secret, hex encoded
//! and prefixed with `v0=`.

use crate::error::{ChatsdjError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a request timestamp, in seconds
pub const MAX_REQUEST_AGE_SECS: i64 = 60 * 5;

const SIGNATURE_VERSION: &str = "v0";

fn signing_mac(secret: &str, timestamp: &str, body: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ChatsdjError::Signature(format!("Invalid signing secret: {}", e)))?;
    mac.update(format!("{}:{}:{}", SIGNATURE_VERSION, timestamp, body).as_bytes());
    Ok(mac)
}

/// Computes the `v0=` signature for a request
///
/// # Examples
///
/// ```
/// use chatsdj::slack::verify::compute_signature;
///
/// let signature = compute_signature("secret", "1531420618", "body").unwrap();
/// assert!(signature.starts_with("v0="));
/// assert_eq!(signature.len(), 3 + 64);
/// ```
pub fn compute_signature(secret: &str, timestamp: &str, body: &str) -> Result<String> {
    let mac = signing_mac(secret, timestamp, body)?;
    Ok(format!(
        "{}={}",
        SIGNATURE_VERSION,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verifies an inbound Slack request
///
/// # Arguments
///
/// * `secret` - App signing secret
/// * `timestamp` - Value of the `X-Slack-Request-Timestamp` header
/// * `signature` - Value of the `X-Slack-Signature` header
/// * `body` - Raw request body
/// * `now` - Current unix time in seconds
///
/// # Errors
///
/// Returns `ChatsdjError::Signature` when the timestamp is missing, not a
/// number or more than five minutes away from `now`, or when the signature does not match
pub fn verify_request(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &str,
    now: i64,
) -> Result<()> {
    let timestamp =
        timestamp.ok_or_else(|| ChatsdjError::Signature("Missing request timestamp".to_string()))?;
    let issued_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| ChatsdjError::Signature(format!("Invalid request timestamp: {}", timestamp)))?;
    let is_fresh = now
        .checked_sub(issued_at)
        .is_some_and(|age| age.unsigned_abs() <= MAX_REQUEST_AGE_SECS.unsigned_abs());
    if !is_fresh {
        return Err(ChatsdjError::Signature(format!(
            "Request timestamp is too old: {}",
            timestamp
        ))
        .into());
    }

    let signature =
        signature.ok_or_else(|| ChatsdjError::Signature("Missing request signature".to_string()))?;
    let expected = signature
        .strip_prefix("v0=")
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
        .ok_or_else(|| ChatsdjError::Signature("Malformed request signature".to_string()))?;

    signing_mac(secret, timestamp, body)?
        .verify_slice(&expected)
        .map_err(|_| ChatsdjError::Signature("Signature mismatch".to_string()))?;

    Ok(())
}
