//! Counsellor turn orchestration
//!
//! A turn handles one `app_mention` event from persona selection to the
//! final state of the bot's reply:
//! - picks a persona and rebuilds the prompt from the thread
//! - posts a draft message as the persona
//! - resolves the model and streams the completion into the draft
//! - answers image tool calls with an uploaded image

use crate::agent::conversation::Conversation;
use crate::agent::reply::{DraftMessage, Replier, ReplyHandler, IMAGE_TOOL_NAME};
use crate::config::Config;
use crate::error::Result;
use crate::persona::{select_persona, Persona, PersonaSource};
use crate::providers::{CompletionClient, ToolDefinition, ToolInvocation};
use crate::slack::{AppMentionEvent, SlackApi};
use std::sync::Arc;
use tracing::Instrument;

/// Declaration of the image generation tool
///
/// # Examples
///
/// ```
/// use chatsdj::agent::image_generation_tool;
///
/// let tool = image_generation_tool();
/// assert_eq!(tool.name(), "generate_image");
/// ```
pub fn image_generation_tool() -> ToolDefinition {
    ToolDefinition::function(
        IMAGE_TOOL_NAME,
        "Generate an image from a prompt",
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "the description for generating an image"
                }
            },
            "required": ["prompt"]
        }),
    )
}

/// Everything a turn needs to know about the triggering mention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionContext {
    /// The mention event
    pub event: AppMentionEvent,
    /// User id of the bot installation
    pub bot_user_id: String,
    /// App id of the bot
    pub app_id: String,
}

/// The bot: answers mentions as a persona
///
/// # Examples
///
/// ```ignore
/// use chatsdj::agent::{Counsellor, MentionContext};
///
/// # async fn example(counsellor: Counsellor, ctx: MentionContext) {
/// counsellor.handle_mention(ctx).await;
/// # }
/// ```
pub struct Counsellor {
    slack: Arc<dyn SlackApi>,
    completion: Arc<dyn CompletionClient>,
    personas: Option<Arc<dyn PersonaSource>>,
    config: Arc<Config>,
}

impl Counsellor {
    /// Creates a counsellor
    ///
    /// # Arguments
    ///
    /// * `slack` - Slack Web API client
    /// * `completion` - Completion API client
    /// * `personas` - Persona source; the default persona is used without one
    /// * `config` - Model names and message templates
    pub fn new(
        slack: Arc<dyn SlackApi>,
        completion: Arc<dyn CompletionClient>,
        personas: Option<Arc<dyn PersonaSource>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            slack,
            completion,
            personas,
            config,
        }
    }

    fn default_persona(&self) -> Persona {
        Persona::default_with_emoji(self.config.messages.default_counsellor_emoji.clone())
    }

    /// Handles one mention from start to finish
    ///
    /// Every failure is reported in the thread; this never returns an error.
    pub async fn handle_mention(&self, ctx: MentionContext) {
        let span = tracing::info_span!(
            "turn",
            event_ts = %ctx.event.ts,
            channel = %ctx.event.channel
        );
        self.run_turn(ctx).instrument(span).await
    }

    async fn run_turn(&self, ctx: MentionContext) {
        tracing::info!(
            "Turn started (default model: {})",
            self.config.openai.default_model
        );

        let replier = Replier::new(
            self.slack.clone(),
            self.config.messages.clone(),
            ctx.event.channel.clone(),
            ctx.event.reply_thread_ts(),
        );

        let (persona, conversation) = match self.prepare(&ctx).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!("Preparing turn failed: {:#}", e);
                replier.post_error_message(&e, None, false).await;
                return;
            }
        };
        tracing::info!(
            "Persona: {} (emoji: :{}:, model: {:?})",
            persona.name,
            persona.emoji,
            persona.model
        );

        let messages = conversation.messages();
        let reply_broadcast = conversation.is_first_turn();

        let draft = match replier.post_draft(&persona, reply_broadcast).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::error!("Posting draft message failed: {:#}", e);
                replier.post_error_message(&e, None, reply_broadcast).await;
                return;
            }
        };

        let model = match self.resolve_model(&persona).await {
            Ok(model) => model,
            Err(e) => {
                tracing::error!("Listing models failed: {:#}", e);
                replier
                    .post_error_message(&e, Some(&draft), reply_broadcast)
                    .await;
                return;
            }
        };
        tracing::debug!("Using model {}", model);

        let handler = ReplyHandler::new(&replier, &draft);
        let tools = [image_generation_tool()];
        if let Err(e) = self
            .completion
            .chat_completions(&messages, &model, &tools, &handler)
            .await
        {
            tracing::error!("Chat completion failed: {:#}", e);
            replier
                .post_error_message(&e, Some(&draft), reply_broadcast)
                .await;
            return;
        }

        if let Some(invocation) = handler.take_tool_invocation() {
            self.reply_image(&replier, &draft, &invocation, reply_broadcast)
                .await;
        }

        tracing::info!("Turn finished");
    }

    async fn prepare(&self, ctx: &MentionContext) -> Result<(Persona, Conversation)> {
        let persona = select_persona(self.personas.as_deref(), &self.default_persona()).await?;

        let conversation = match ctx.event.thread_ts.as_deref() {
            None => Conversation::from_mention(&ctx.event.text),
            Some(thread_ts) => {
                let replies = self
                    .slack
                    .fetch_thread_replies(&ctx.event.channel, thread_ts)
                    .await?;
                Conversation::from_thread(&replies, &ctx.bot_user_id, &ctx.app_id)
            }
        };

        let conversation = conversation.with_persona(&persona);
        Ok((persona, conversation))
    }

    /// Picks the persona's model when it is deployed, else the default
    async fn resolve_model(&self, persona: &Persona) -> Result<String> {
        let available = self.completion.list_models().await?;
        let default_model = &self.config.openai.default_model;

        match persona.model.as_deref() {
            Some(model) if available.iter().any(|m| m == model) => Ok(model.to_string()),
            Some(model) => {
                tracing::debug!(
                    "Model {} is not available; using {}",
                    model,
                    default_model
                );
                Ok(default_model.clone())
            }
            None => Ok(default_model.clone()),
        }
    }

    async fn reply_image(
        &self,
        replier: &Replier,
        draft: &DraftMessage,
        invocation: &ToolInvocation,
        reply_broadcast: bool,
    ) {
        replier
            .reply_image(
                draft,
                invocation,
                self.completion.as_ref(),
                &self.config.openai.image_model,
                reply_broadcast,
            )
            .await
    }
}
