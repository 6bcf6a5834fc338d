//! Slack Events API webhook server
//!
//! Verifies inbound requests, answers the URL verification handshake, and
//! hands `app_mention` events to the counsellor on a background task so Slack
//! gets its acknowledgment immediately.

use crate::agent::{Counsellor, MentionContext};
use crate::error::{ChatsdjError, Result};
use crate::slack::{verify_request, EventPayload, SlackEvent};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

/// Header carrying the request timestamp
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Shared state of the webhook handlers
#[derive(Clone)]
pub struct AppState {
    counsellor: Arc<Counsellor>,
    signing_secret: Arc<str>,
}

impl AppState {
    /// Creates handler state
    pub fn new(counsellor: Arc<Counsellor>, signing_secret: impl Into<Arc<str>>) -> Self {
        Self {
            counsellor,
            signing_secret: signing_secret.into(),
        }
    }
}

/// Builds the webhook router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/slack/events", post(slack_events))
        .route("/health", get(health))
        .with_state(state)
}

/// Binds the listen address and serves until the process exits
///
/// # Errors
///
/// Returns error if the address is invalid or cannot be bound
pub async fn serve(listen_addr: &str, state: AppState) -> Result<()> {
    let addr: SocketAddr = listen_addr.parse().map_err(|e| {
        ChatsdjError::Config(format!("Invalid listen address '{}': {}", listen_addr, e))
    })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening for Slack events on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn slack_events(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    if state.signing_secret.is_empty() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "SLACK_SIGNING_SECRET is not set",
        )
            .into_response();
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        return (StatusCode::BAD_REQUEST, "Invalid Content-Type").into_response();
    }

    let header_value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if let Err(e) = verify_request(
        &state.signing_secret,
        header_value(TIMESTAMP_HEADER),
        header_value(SIGNATURE_HEADER),
        &body,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!("Rejected Slack request: {:#}", e);
        return (StatusCode::BAD_REQUEST, "Invalid Signature").into_response();
    }

    let payload: EventPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Unparsable Slack payload: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid Payload").into_response();
        }
    };

    match payload {
        EventPayload::UrlVerification { challenge } => (StatusCode::OK, challenge).into_response(),
        EventPayload::EventCallback(callback) => {
            let bot_user_id = callback.bot_user_id().unwrap_or_default().to_string();
            match callback.event {
                SlackEvent::AppMention(event) => {
                    tracing::info!("Received app_mention {} in {}", event.ts, event.channel);
                    let ctx = MentionContext {
                        event,
                        bot_user_id,
                        app_id: callback.api_app_id,
                    };
                    let counsellor = state.counsellor.clone();
                    tokio::spawn(async move {
                        counsellor.handle_mention(ctx).await;
                    });
                }
                SlackEvent::Other => {
                    tracing::info!("Ignoring unsupported event type");
                }
            }
            StatusCode::OK.into_response()
        }
        EventPayload::Unknown => {
            tracing::info!("Ignoring unsupported body type");
            StatusCode::OK.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::slack::verify::compute_signature;
    use crate::test_utils::{RecordingSlack, ScriptedCompletion};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const SECRET: &str = "test-signing-secret";

    fn state(secret: &str) -> AppState {
        let counsellor = Counsellor::new(
            Arc::new(RecordingSlack::default()),
            Arc::new(ScriptedCompletion::default()),
            None,
            Arc::new(Config::default()),
        );
        AppState::new(Arc::new(counsellor), secret)
    }

    fn signed_request(body: &str, content_type: &str) -> Request<Body> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = compute_signature(SECRET, &timestamp, body).unwrap();
        Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header(header::CONTENT_TYPE, content_type)
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(state(SECRET))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn test_url_verification_returns_challenge() {
        let body = r#"{"type":"url_verification","token":"t","challenge":"abc123"}"#;
        let response = router(state(SECRET))
            .oneshot(signed_request(body, "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "abc123");
    }

    #[tokio::test]
    async fn test_rejects_wrong_content_type() {
        let body = r#"{"type":"url_verification","challenge":"abc"}"#;
        let response = router(state(SECRET))
            .oneshot(signed_request(body, "application/x-www-form-urlencoded"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid Content-Type");
    }

    #[tokio::test]
    async fn test_rejects_bad_signature() {
        let request = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header(header::CONTENT_TYPE, "application/json")
            .header(TIMESTAMP_HEADER, chrono::Utc::now().timestamp().to_string())
            .header(SIGNATURE_HEADER, "v0=deadbeef")
            .body(Body::from(r#"{"type":"url_verification","challenge":"abc"}"#))
            .unwrap();
        let response = router(state(SECRET)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid Signature");
    }

    #[tokio::test]
    async fn test_missing_signing_secret_is_server_error() {
        let body = r#"{"type":"url_verification","challenge":"abc"}"#;
        let response = router(state(""))
            .oneshot(signed_request(body, "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unsupported_types_are_acknowledged() {
        for body in [
            r#"{"type":"app_rate_limited"}"#,
            r#"{"type":"event_callback","api_app_id":"A1","event":{"type":"reaction_added"}}"#,
        ] {
            let response = router(state(SECRET))
                .oneshot(signed_request(body, "application/json"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let response = router(state(SECRET))
            .oneshot(signed_request("not json", "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
