use base64::Engine as _;
use serde_json::{json, Value};
use chatsdj::config::{GoogleConfig, OpenAIConfig, SlackConfig};

/// Completion API settings pointing at a mock server
#[allow(dead_code)]
pub fn openai_config(uri: &str) -> OpenAIConfig {
    OpenAIConfig {
        api_key: "sk-test".to_string(),
        api_base: uri.to_string(),
        timeout_seconds: 5,
        ..Default::default()
    }
}

/// Slack settings pointing at a mock server
#[allow(dead_code)]
pub fn slack_config(uri: &str) -> SlackConfig {
    SlackConfig {
        api_token: "xoxb-test".to_string(),
        signing_secret: "test-signing-secret".to_string(),
        api_base: uri.to_string(),
    }
}

/// Google settings pointing at a mock server with the fixture key
#[allow(dead_code)]
pub fn google_config(uri: &str) -> GoogleConfig {
    GoogleConfig {
        credentials: Some(encoded_service_account()),
        spreadsheet_id: Some("SHEET_ID".to_string()),
        token_url: format!("{}/token", uri),
        sheets_api_base: uri.to_string(),
        ..Default::default()
    }
}

/// `GOOGLE_CREDENTIALS` value built from the fixture key
#[allow(dead_code)]
pub fn encoded_service_account() -> String {
    let account = json!({
        "type": "service_account",
        "client_email": "chatsdj@example.iam.gserviceaccount.com",
        "private_key": include_str!("../fixtures/service_account_key.pem"),
    });
    base64::engine::general_purpose::STANDARD.encode(account.to_string())
}

/// Chunk frame carrying a content delta
#[allow(dead_code)]
pub fn content_frame(content: &str) -> Value {
    json!({"choices": [{"index": 0, "delta": {"content": content}}]})
}

/// Chunk frame carrying a tool call fragment
#[allow(dead_code)]
pub fn tool_call_frame(index: u32, name: Option<&str>, arguments: &str) -> Value {
    let mut function = json!({"arguments": arguments});
    if let Some(name) = name {
        function["name"] = json!(name);
    }
    json!({
        "choices": [{
            "index": 0,
            "delta": {"tool_calls": [{"index": index, "type": "function", "function": function}]}
        }]
    })
}

/// Event stream body: one `data:` line per frame, then the done marker
#[allow(dead_code)]
pub fn sse_body(frames: &[Value]) -> String {
    let mut body = String::new();
    for frame in frames {
        body.push_str(&format!("data: {}\n\n", frame));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// A 1x1 PNG, base64 encoded
#[allow(dead_code)]
pub const TINY_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
