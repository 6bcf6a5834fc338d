//! Base completion client trait and common types for chatsdj
//!
//! This module defines the [`CompletionClient`] trait the orchestrator drives,
//! the chat [`Message`] type, tool declarations, and the
//! [`StreamingResponse`] values delivered to a [`StreamingHandler`] while a
//! completion streams in.

use crate::error::{ChatsdjError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona instructions; always the first message of a prompt
    System,
    /// A human turn
    User,
    /// A bot turn
    Assistant,
}

/// Message structure for the prompt
///
/// An ordered sequence of messages forms the prompt; the order must match
/// the conversation chronology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new system message
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::providers::{Message, Role};
    ///
    /// let msg = Message::system("You are a helpful assistant");
    /// assert_eq!(msg.role, Role::System);
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::providers::{Message, Role};
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::providers::{Message, Role};
    ///
    /// let msg = Message::assistant("Hello, user!");
    /// assert_eq!(msg.role, Role::Assistant);
    /// ```
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Callable function advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

/// Tool declaration in chat completions format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    /// Function tool
    Function {
        /// The function being declared
        function: FunctionDefinition,
    },
}

impl ToolDefinition {
    /// Declares a function tool
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::providers::ToolDefinition;
    /// use serde_json::json;
    ///
    /// let tool = ToolDefinition::function("ping", "Ping", json!({"type": "object"}));
    /// assert_eq!(tool.name(), "ping");
    /// ```
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self::Function {
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Name of the declared function
    pub fn name(&self) -> &str {
        match self {
            Self::Function { function } => &function.name,
        }
    }
}

/// A completed tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Name of the function to call
    pub name: String,
    /// Parsed JSON arguments
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    /// Returns a string argument by key, if present
    pub fn string_argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// One update delivered while a completion streams
///
/// Text and tool outcomes are mutually exclusive for a given completion. A
/// text completion produces zero or more previews followed by exactly one
/// completed value; a tool completion produces exactly one `Tool` value.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamingResponse {
    /// Accumulated text so far
    Text {
        /// All content received so far
        message: String,
        /// Whether the stream has ended
        is_completed: bool,
    },
    /// A completed tool call
    Tool(ToolInvocation),
}

impl StreamingResponse {
    /// Whether this is the terminal value of the stream
    pub fn is_completed(&self) -> bool {
        match self {
            Self::Text { is_completed, .. } => *is_completed,
            Self::Tool(_) => true,
        }
    }
}

/// Receives streaming updates from [`CompletionClient::chat_completions`]
///
/// The client awaits every call before decoding the next frame, so updates
/// arrive in stream order.
#[async_trait]
pub trait StreamingHandler: Send + Sync {
    /// Handles one streaming update
    async fn on_response(&self, response: StreamingResponse);
}

#[async_trait]
impl StreamingHandler for tokio::sync::mpsc::UnboundedSender<StreamingResponse> {
    async fn on_response(&self, response: StreamingResponse) {
        if self.send(response).is_err() {
            tracing::warn!("Streaming response receiver dropped");
        }
    }
}

/// A generated raster image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Base64 encoded PNG
    pub b64_json: String,
    /// Prompt as rewritten by the image model, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

impl GeneratedImage {
    /// Decodes the base64 payload into raw image bytes
    ///
    /// # Errors
    ///
    /// Returns `ChatsdjError::Protocol` if the payload is not valid base64
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::providers::GeneratedImage;
    ///
    /// let image = GeneratedImage {
    ///     b64_json: "RFVNTVlfSU1BR0U=".to_string(),
    ///     revised_prompt: None,
    /// };
    /// assert_eq!(image.decode().unwrap(), b"DUMMY_IMAGE");
    /// ```
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.b64_json.as_bytes())
            .map_err(|e| ChatsdjError::Protocol(format!("Invalid image payload: {}", e)).into())
    }
}

/// Completion API client
///
/// The orchestrator depends on this trait rather than on a concrete HTTP
/// client so turns can be driven by scripted clients in tests.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Streams a chat completion
    ///
    /// # Arguments
    ///
    /// * `messages` - Prompt history, system message first
    /// * `model` - Model identifier
    /// * `tools` - Functions advertised to the model
    /// * `handler` - Receives previews and the terminal response
    ///
    /// # Errors
    ///
    /// Returns error on non-success status, a missing or unreadable body, or
    /// a malformed frame. The terminal response is not delivered in any of
    /// these cases.
    async fn chat_completions(
        &self,
        messages: &[Message],
        model: &str,
        tools: &[ToolDefinition],
        handler: &dyn StreamingHandler,
    ) -> Result<()>;

    /// Lists the identifiers of currently deployed models
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Generates one image from a prompt
    async fn generate_image(&self, prompt: &str, model: &str) -> Result<GeneratedImage>;
}
