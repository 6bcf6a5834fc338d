//! Draft message reconciliation
//!
//! Every turn owns a single placeholder message in the thread. Streaming text
//! is written into it in place, an image reply replaces it with an uploaded
//! file, and failures replace it with an error message.

use crate::config::MessagesConfig;
use crate::error::{ChatsdjError, Result};
use crate::persona::Persona;
use crate::providers::{CompletionClient, StreamingHandler, StreamingResponse, ToolInvocation};
use crate::slack::{PostMessageOptions, ReplyMetadata, SlackApi, UpdateMessageOptions};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// File name used for uploaded images
pub const IMAGE_FILENAME: &str = "chatsdj.png";

/// Name of the image generation tool advertised to the model
pub const IMAGE_TOOL_NAME: &str = "generate_image";

/// The placeholder message of a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftMessage {
    /// Channel id
    pub channel: String,
    /// Message timestamp
    pub ts: String,
}

/// Posts and updates the bot's messages in one thread
pub struct Replier {
    slack: Arc<dyn SlackApi>,
    messages: MessagesConfig,
    channel: String,
    thread_ts: String,
}

impl Replier {
    /// Creates a replier for a thread
    pub fn new(
        slack: Arc<dyn SlackApi>,
        messages: MessagesConfig,
        channel: impl Into<String>,
        thread_ts: impl Into<String>,
    ) -> Self {
        Self {
            slack,
            messages,
            channel: channel.into(),
            thread_ts: thread_ts.into(),
        }
    }

    /// Posts the placeholder message as the persona
    ///
    /// # Errors
    ///
    /// Returns error if the post fails
    pub async fn post_draft(&self, persona: &Persona, reply_broadcast: bool) -> Result<DraftMessage> {
        let posted = self
            .slack
            .post_message(
                &self.channel,
                &self.messages.initial_message,
                PostMessageOptions {
                    thread_ts: Some(self.thread_ts.clone()),
                    reply_broadcast,
                    username: Some(persona.name.clone()),
                    icon_emoji: Some(persona.emoji.clone()),
                    metadata: Some(ReplyMetadata::Ignored),
                },
            )
            .await?;

        tracing::debug!("Posted draft message {}", posted.ts);
        Ok(DraftMessage {
            channel: posted.channel,
            ts: posted.ts,
        })
    }

    /// Writes streamed text into the draft
    ///
    /// While the stream is still running the loading sign is appended.
    /// Failures are logged.
    pub async fn reply_text(&self, draft: &DraftMessage, message: &str, is_completed: bool) {
        let text = if is_completed {
            message.to_string()
        } else {
            format!("{}{}", message, self.messages.loading_sign)
        };

        if let Err(e) = self
            .slack
            .update_message(
                &draft.channel,
                &draft.ts,
                UpdateMessageOptions::text(text, ReplyMetadata::Text),
            )
            .await
        {
            tracing::error!("Updating draft message failed: {:#}", e);
        }
    }

    /// Answers a tool call with a generated image
    ///
    /// The draft is replaced by the uploaded image, which is then tagged with
    /// the prompt and broadcast when requested. Every failure is routed to
    /// [`Replier::post_error_message`].
    pub async fn reply_image(
        &self,
        draft: &DraftMessage,
        invocation: &ToolInvocation,
        completion: &dyn CompletionClient,
        image_model: &str,
        reply_broadcast: bool,
    ) {
        if invocation.name != IMAGE_TOOL_NAME {
            let error: anyhow::Error =
                ChatsdjError::Protocol(format!("Unknown tool: {}", invocation.name)).into();
            self.post_error_message(&error, Some(draft), reply_broadcast).await;
            return;
        }
        let Some(prompt) = invocation.string_argument("prompt") else {
            let error: anyhow::Error =
                ChatsdjError::Protocol(format!("{} called without a prompt", IMAGE_TOOL_NAME)).into();
            self.post_error_message(&error, Some(draft), reply_broadcast).await;
            return;
        };

        if let Err(e) = self
            .slack
            .update_message(
                &draft.channel,
                &draft.ts,
                UpdateMessageOptions {
                    text: Some(self.messages.image_generation_loading_message.clone()),
                    ..Default::default()
                },
            )
            .await
        {
            tracing::error!("Updating draft message failed: {:#}", e);
        }

        let bytes = match completion
            .generate_image(prompt, image_model)
            .await
            .and_then(|image| image.decode())
        {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Image generation failed: {:#}", e);
                self.post_error_message(&e, Some(draft), reply_broadcast).await;
                return;
            }
        };

        let draft_deleted = match self.slack.delete_message(&draft.channel, &draft.ts).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Deleting draft message failed: {:#}", e);
                false
            }
        };

        let file = match self
            .slack
            .upload_image(bytes, IMAGE_FILENAME, prompt, &self.channel, Some(&self.thread_ts))
            .await
        {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("Image upload failed: {:#}", e);
                let remaining_draft = (!draft_deleted).then_some(draft);
                self.post_error_message(&e, remaining_draft, reply_broadcast).await;
                return;
            }
        };

        let Some((shared_channel, shared_ts)) = file.share_location() else {
            tracing::error!("Uploaded file {} has no share to tag", file.id);
            return;
        };

        if let Err(e) = self
            .slack
            .update_message(
                shared_channel,
                shared_ts,
                UpdateMessageOptions::text(
                    " ",
                    ReplyMetadata::Image {
                        prompt: prompt.to_string(),
                    },
                ),
            )
            .await
        {
            tracing::error!("Tagging image message failed: {:#}", e);
        }

        // Content and broadcast changes cannot share one update
        if reply_broadcast {
            if let Err(e) = self
                .slack
                .update_message(shared_channel, shared_ts, UpdateMessageOptions::broadcast())
                .await
            {
                tracing::error!("Broadcasting image message failed: {:#}", e);
            }
        }
    }

    /// Reports a failed turn in the thread
    ///
    /// With a draft, the draft is deleted; if that fails the draft is
    /// overwritten with the error instead. Otherwise a new message carrying
    /// the error is posted. Never fails; sub-failures are logged.
    pub async fn post_error_message(
        &self,
        error: &anyhow::Error,
        draft: Option<&DraftMessage>,
        reply_broadcast: bool,
    ) {
        let text = self.error_text(error);

        if let Some(draft) = draft {
            if let Err(e) = self.slack.delete_message(&draft.channel, &draft.ts).await {
                tracing::error!("Deleting draft message failed: {:#}", e);
                if let Err(e) = self
                    .slack
                    .update_message(
                        &draft.channel,
                        &draft.ts,
                        UpdateMessageOptions {
                            text: Some(text),
                            ..Default::default()
                        },
                    )
                    .await
                {
                    tracing::error!("Updating draft with error message failed: {:#}", e);
                }
                return;
            }
        }

        if let Err(e) = self
            .slack
            .post_message(
                &self.channel,
                &text,
                PostMessageOptions {
                    thread_ts: Some(self.thread_ts.clone()),
                    reply_broadcast,
                    metadata: Some(ReplyMetadata::Ignored),
                    ..Default::default()
                },
            )
            .await
        {
            tracing::error!("Posting error message failed: {:#}", e);
        }
    }

    fn error_text(&self, error: &anyhow::Error) -> String {
        let detail = format!("{:#}", error);
        if detail.is_empty() {
            self.messages.error_message.clone()
        } else {
            format!("{}\n```\n{}\n```", self.messages.error_message, detail)
        }
    }
}

/// Streaming handler that writes text into a draft
///
/// Tool calls are held until the stream finishes so the image branch runs
/// after the completion request has returned.
pub struct ReplyHandler<'a> {
    replier: &'a Replier,
    draft: &'a DraftMessage,
    tool: Mutex<Option<ToolInvocation>>,
}

impl<'a> ReplyHandler<'a> {
    /// Creates a handler for a draft
    pub fn new(replier: &'a Replier, draft: &'a DraftMessage) -> Self {
        Self {
            replier,
            draft,
            tool: Mutex::new(None),
        }
    }

    /// Takes the tool call received from the stream, if any
    pub fn take_tool_invocation(&self) -> Option<ToolInvocation> {
        self.tool.lock().ok().and_then(|mut tool| tool.take())
    }
}

#[async_trait]
impl StreamingHandler for ReplyHandler<'_> {
    async fn on_response(&self, response: StreamingResponse) {
        match response {
            StreamingResponse::Text {
                message,
                is_completed,
            } => {
                self.replier
                    .reply_text(self.draft, &message, is_completed)
                    .await
            }
            StreamingResponse::Tool(invocation) => {
                tracing::info!("Model requested tool: {}", invocation.name);
                if let Ok(mut tool) = self.tool.lock() {
                    *tool = Some(invocation);
                }
            }
        }
    }
}
