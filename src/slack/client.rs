//! Slack Web API client

use crate::config::SlackConfig;
use crate::error::{ChatsdjError, Result};
use crate::slack::types::{
    PostMessageOptions, PostedMessage, ThreadReply, UpdateMessageOptions, UploadedFile,
};
use crate::slack::SlackApi;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RepliesResponse {
    #[serde(default)]
    messages: Vec<ThreadReply>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

/// Client for the Slack Web API authenticated with a bot token
#[derive(Debug, Clone)]
pub struct SlackWebClient {
    http: Client,
    bot_token: String,
    api_base: String,
}

impl SlackWebClient {
    /// Creates a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ChatsdjError::Slack(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            bot_token: config.api_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// Checks the `ok` flag of a Web API response and decodes the rest
    fn parse_result<T: DeserializeOwned>(method: &str, body: Value) -> Result<T> {
        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let error = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            return Err(ChatsdjError::Slack(format!("{} failed: {}", method, error)).into());
        }
        serde_json::from_value(body).map_err(|e| {
            ChatsdjError::Slack(format!("{} returned an unexpected payload: {}", method, e)).into()
        })
    }

    /// Makes a form-encoded POST Slack API call
    async fn api_form<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let body: Value = self
            .http
            .post(self.method_url(method))
            .bearer_auth(&self.bot_token)
            .form(params)
            .send()
            .await?
            .json()
            .await?;
        Self::parse_result(method, body)
    }
}

#[async_trait]
impl SlackApi for SlackWebClient {
    async fn fetch_thread_replies(&self, channel: &str, thread_ts: &str) -> Result<Vec<ThreadReply>> {
        let mut replies = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![
                ("channel", channel.to_string()),
                ("ts", thread_ts.to_string()),
                ("include_all_metadata", "true".to_string()),
            ];
            if let Some(cursor) = cursor.take() {
                params.push(("cursor", cursor));
            }

            let page: RepliesResponse = self.api_form("conversations.replies", &params).await?;
            replies.extend(page.messages);

            let next = page
                .response_metadata
                .map(|m| m.next_cursor)
                .filter(|c| !c.is_empty());
            match next {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(
            "Fetched {} replies for thread {} in {}",
            replies.len(),
            thread_ts,
            channel
        );
        Ok(replies)
    }

    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        options: PostMessageOptions,
    ) -> Result<PostedMessage> {
        let mut params = vec![("channel", channel.to_string()), ("text", text.to_string())];
        if let Some(thread_ts) = options.thread_ts {
            params.push(("thread_ts", thread_ts));
        }
        if options.reply_broadcast {
            params.push(("reply_broadcast", "true".to_string()));
        }
        if let Some(username) = options.username {
            params.push(("username", username));
        }
        if let Some(icon_emoji) = options.icon_emoji {
            params.push(("icon_emoji", icon_emoji));
        }
        if let Some(metadata) = options.metadata {
            params.push(("metadata", metadata.to_json_string()));
        }

        self.api_form("chat.postMessage", &params).await
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        options: UpdateMessageOptions,
    ) -> Result<()> {
        let mut params = vec![("channel", channel.to_string()), ("ts", ts.to_string())];
        if let Some(text) = options.text {
            params.push(("text", text));
        }
        if let Some(metadata) = options.metadata {
            params.push(("metadata", metadata.to_json_string()));
        }
        if let Some(reply_broadcast) = options.reply_broadcast {
            params.push(("reply_broadcast", reply_broadcast.to_string()));
        }

        let _: Value = self.api_form("chat.update", &params).await?;
        Ok(())
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<()> {
        let params = [("channel", channel.to_string()), ("ts", ts.to_string())];
        let _: Value = self.api_form("chat.delete", &params).await?;
        Ok(())
    }

    async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        title: &str,
        channel: &str,
        thread_ts: Option<&str>,
    ) -> Result<UploadedFile> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("image/png")?;

        let mut form = Form::new()
            .text("channels", channel.to_string())
            .text("filename", filename.to_string())
            .text("title", title.to_string())
            .text("filetype", "png")
            .part("file", part);
        if let Some(thread_ts) = thread_ts {
            form = form.text("thread_ts", thread_ts.to_string());
        }

        tracing::debug!("Uploading {} ({} bytes) to {}", filename, size, channel);

        let body: Value = self
            .http
            .post(self.method_url("files.upload"))
            .bearer_auth(&self.bot_token)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        let response: UploadResponse = Self::parse_result("files.upload", body)?;
        Ok(response.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_url_uses_configured_base() {
        let client = SlackWebClient::new(&SlackConfig {
            api_base: "http://127.0.0.1:1234/api/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.method_url("chat.postMessage"),
            "http://127.0.0.1:1234/api/chat.postMessage"
        );
    }

    #[test]
    fn test_parse_result_not_ok() {
        let err = SlackWebClient::parse_result::<Value>(
            "chat.update",
            json!({"ok": false, "error": "message_not_found"}),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Slack API error: chat.update failed: message_not_found"
        );
    }

    #[test]
    fn test_parse_result_missing_ok_flag() {
        let err = SlackWebClient::parse_result::<Value>("chat.delete", json!({})).unwrap_err();
        assert!(err.to_string().contains("chat.delete failed: unknown"));
    }

    #[test]
    fn test_parse_result_decodes_payload() {
        let posted: PostedMessage = SlackWebClient::parse_result(
            "chat.postMessage",
            json!({"ok": true, "channel": "C1", "ts": "1.1", "message": {}}),
        )
        .unwrap();
        assert_eq!(posted.channel, "C1");
        assert_eq!(posted.ts, "1.1");
    }
}
