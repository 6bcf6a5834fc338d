//! OpenAI-compatible completion client
//!
//! Streams chat completions over server-sent events, lists deployed models,
//! and generates images.

use crate::config::OpenAIConfig;
use crate::error::{ChatsdjError, Result};
use crate::providers::base::{
    CompletionClient, GeneratedImage, Message, StreamingHandler, ToolDefinition,
};
use crate::providers::sse::{data_payload, SseLineBuffer, StreamDecoder};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body for `POST /chat/completions`
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

/// Request body for `POST /images/generations`
#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// HTTP client for an OpenAI-compatible API
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    ///
    /// # Arguments
    ///
    /// * `config` - API key, base URL and request limits
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::config::OpenAIConfig;
    /// use chatsdj::providers::OpenAIClient;
    ///
    /// let config = OpenAIConfig {
    ///     api_key: "sk-test".to_string(),
    ///     ..Default::default()
    /// };
    /// assert!(OpenAIClient::new(config).is_ok());
    /// ```
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("chatsdj/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ChatsdjError::Completion(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            "Initialized OpenAI client: api_base={}, model={}",
            config.api_base,
            config.default_model
        );

        Ok(Self { client, config })
    }

    /// Configured default chat model
    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Configured image model
    pub fn image_model(&self) -> &str {
        &self.config.image_model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn error_for_status(
        operation: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!("{} failed ({}): {}", operation, status, body);
        Err(ChatsdjError::Completion(format!("{} failed ({}): {}", operation, status, body)).into())
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn chat_completions(
        &self,
        messages: &[Message],
        model: &str,
        tools: &[ToolDefinition],
        handler: &dyn StreamingHandler,
    ) -> Result<()> {
        let request = ChatCompletionRequest {
            model,
            messages,
            tools,
            stream: true,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            "Requesting chat completion: model={}, messages={}, tools={}",
            model,
            messages.len(),
            tools.len()
        );

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let response = Self::error_for_status("chat/completions", response).await?;
        let status = response.status();

        let mut decoder = StreamDecoder::new();
        let mut payloads = 0usize;
        {
            let mut body = response.bytes_stream();
            let mut lines = SseLineBuffer::new();

            'stream: while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                for line in lines.push(&chunk) {
                    let Some(payload) = data_payload(&line) else {
                        continue;
                    };
                    payloads += 1;
                    if let Some(preview) = decoder.push_payload(payload)? {
                        handler.on_response(preview).await;
                    }
                    if decoder.is_done() {
                        break 'stream;
                    }
                }
            }

            if !decoder.is_done() {
                if let Some(line) = lines.finish() {
                    if let Some(payload) = data_payload(&line) {
                        payloads += 1;
                        if let Some(preview) = decoder.push_payload(payload)? {
                            handler.on_response(preview).await;
                        }
                    }
                }
            }
        }

        if payloads == 0 {
            tracing::error!("chat/completions returned no event stream ({})", status);
            return Err(ChatsdjError::Completion(format!(
                "chat/completions failed ({}): NoBody",
                status
            ))
            .into());
        }

        let terminal = decoder.finish()?;
        tracing::debug!("Chat completion finished: {:?}", terminal);
        handler.on_response(terminal).await;
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;
        let response = Self::error_for_status("models", response).await?;

        let list: ModelList = response.json().await.map_err(|e| {
            ChatsdjError::Protocol(format!("Failed to parse models response: {}", e))
        })?;

        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    async fn generate_image(&self, prompt: &str, model: &str) -> Result<GeneratedImage> {
        let request = ImageGenerationRequest {
            model,
            prompt,
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };

        tracing::info!("Generating image: model={}", model);

        let response = self
            .client
            .post(self.endpoint("images/generations"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let response = Self::error_for_status("images/generations", response).await?;

        let parsed: ImageGenerationResponse = response.json().await.map_err(|e| {
            ChatsdjError::Protocol(format!("Failed to parse image response: {}", e))
        })?;

        parsed.data.into_iter().next().ok_or_else(|| {
            ChatsdjError::Protocol("Image response contained no data".to_string()).into()
        })
    }
}
