//! Test utilities for chatsdj
//!
//! Recording doubles for the Slack and completion API seams, used to drive
//! whole turns without network access.

use crate::error::{ChatsdjError, Result};
use crate::providers::{
    CompletionClient, GeneratedImage, Message, StreamingHandler, StreamingResponse,
    ToolDefinition,
};
use crate::slack::{
    PostMessageOptions, PostedMessage, SlackApi, ThreadReply, UpdateMessageOptions, UploadedFile,
};
use async_trait::async_trait;
use std::sync::Mutex;

/// A Slack Web API call observed by [`RecordingSlack`]
#[derive(Debug, Clone, PartialEq)]
pub enum SlackCall {
    /// `conversations.replies`
    FetchReplies {
        /// Channel id
        channel: String,
        /// Thread timestamp
        thread_ts: String,
    },
    /// `chat.postMessage`
    Post {
        /// Channel id
        channel: String,
        /// Message text
        text: String,
        /// Options sent with the message
        options: PostMessageOptions,
    },
    /// `chat.update`
    Update {
        /// Channel id
        channel: String,
        /// Message timestamp
        ts: String,
        /// Fields sent with the update
        options: UpdateMessageOptions,
    },
    /// `chat.delete`
    Delete {
        /// Channel id
        channel: String,
        /// Message timestamp
        ts: String,
    },
    /// `files.upload`
    Upload {
        /// Uploaded byte count
        size: usize,
        /// File name
        filename: String,
        /// File title
        title: String,
        /// Channel id
        channel: String,
        /// Thread timestamp
        thread_ts: Option<String>,
    },
}

/// In-memory [`SlackApi`] that records every call
///
/// Methods listed in `failing` (by Web API method name, e.g. `chat.delete`)
/// return a Slack error.
#[derive(Debug, Default)]
pub struct RecordingSlack {
    /// Replies returned by `fetch_thread_replies`
    pub replies: Vec<ThreadReply>,
    /// File returned by `upload_image`
    pub uploaded_file: UploadedFile,
    /// Web API methods that fail
    pub failing: Vec<&'static str>,
    pub(crate) calls: Mutex<Vec<SlackCall>>,
}

impl RecordingSlack {
    /// Recorded calls in order
    pub fn calls(&self) -> Vec<SlackCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &str, call: SlackCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.contains(&method) {
            return Err(ChatsdjError::Slack(format!("{} failed: fatal_error", method)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl SlackApi for RecordingSlack {
    async fn fetch_thread_replies(&self, channel: &str, thread_ts: &str) -> Result<Vec<ThreadReply>> {
        self.record(
            "conversations.replies",
            SlackCall::FetchReplies {
                channel: channel.to_string(),
                thread_ts: thread_ts.to_string(),
            },
        )?;
        Ok(self.replies.clone())
    }

    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        options: PostMessageOptions,
    ) -> Result<PostedMessage> {
        self.record(
            "chat.postMessage",
            SlackCall::Post {
                channel: channel.to_string(),
                text: text.to_string(),
                options,
            },
        )?;
        Ok(PostedMessage {
            channel: channel.to_string(),
            ts: "BOT_MESSAGE_TS".to_string(),
        })
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        options: UpdateMessageOptions,
    ) -> Result<()> {
        self.record(
            "chat.update",
            SlackCall::Update {
                channel: channel.to_string(),
                ts: ts.to_string(),
                options,
            },
        )
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<()> {
        self.record(
            "chat.delete",
            SlackCall::Delete {
                channel: channel.to_string(),
                ts: ts.to_string(),
            },
        )
    }

    async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        title: &str,
        channel: &str,
        thread_ts: Option<&str>,
    ) -> Result<UploadedFile> {
        self.record(
            "files.upload",
            SlackCall::Upload {
                size: bytes.len(),
                filename: filename.to_string(),
                title: title.to_string(),
                channel: channel.to_string(),
                thread_ts: thread_ts.map(str::to_string),
            },
        )?;
        Ok(self.uploaded_file.clone())
    }
}

/// A chat completion request observed by [`ScriptedCompletion`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCall {
    /// Prompt messages
    pub messages: Vec<Message>,
    /// Requested model
    pub model: String,
    /// Advertised tools
    pub tools: Vec<ToolDefinition>,
}

/// [`CompletionClient`] replaying scripted responses
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    /// Models returned by `list_models`; `None` makes the call fail
    pub models: Option<Vec<String>>,
    /// Responses delivered to the handler, in order
    pub responses: Vec<StreamingResponse>,
    /// Error returned after delivering `responses`
    pub stream_error: Option<String>,
    /// Image returned by `generate_image`; `None` makes the call fail
    pub image: Option<GeneratedImage>,
    pub(crate) calls: Mutex<Vec<CompletionCall>>,
    pub(crate) image_calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    /// Recorded chat completion requests
    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded `(prompt, model)` image requests
    pub fn image_calls(&self) -> Vec<(String, String)> {
        self.image_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn chat_completions(
        &self,
        messages: &[Message],
        model: &str,
        tools: &[ToolDefinition],
        handler: &dyn StreamingHandler,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(CompletionCall {
            messages: messages.to_vec(),
            model: model.to_string(),
            tools: tools.to_vec(),
        });
        for response in &self.responses {
            handler.on_response(response.clone()).await;
        }
        match &self.stream_error {
            Some(error) => Err(ChatsdjError::Completion(error.clone()).into()),
            None => Ok(()),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.models.clone().ok_or_else(|| {
            ChatsdjError::Completion("models failed (500 Internal Server Error): ".to_string())
                .into()
        })
    }

    async fn generate_image(&self, prompt: &str, model: &str) -> Result<GeneratedImage> {
        self.image_calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.to_string()));
        self.image.clone().ok_or_else(|| {
            ChatsdjError::Completion("images/generations failed (400 Bad Request): ".to_string())
                .into()
        })
    }
}

/// Text response helper
pub fn text_response(message: &str, is_completed: bool) -> StreamingResponse {
    StreamingResponse::Text {
        message: message.to_string(),
        is_completed,
    }
}
