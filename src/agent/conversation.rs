//! Prompt history reconstruction
//!
//! Rebuilds the role-tagged message list sent to the completion API from a
//! Slack thread, using reply metadata to decide which bot messages replay
//! into the prompt.

use crate::persona::Persona;
use crate::providers::{Message, Role};
use crate::slack::{ReplyMetadata, ThreadReply};
use regex::Regex;

/// Maximum number of thread messages kept in the prompt
pub const MAX_HISTORY_MESSAGES: usize = 20;

/// Prefix of the assistant message standing in for a generated image
pub const GENERATED_IMAGE_PREFIX: &str = "generated_image: ";

/// Sentence appended to every persona prompt explaining the image convention
pub const COMMON_PROMPT: &str =
    "`generated_image: `で始まるassistantのメッセージはfunction calling経由で画像が生成されたことを表現しています。";

/// A prompt being assembled for one turn
///
/// The system message is kept apart from the thread history so it is never
/// affected by truncation and always comes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    system: Option<Message>,
    history: Vec<Message>,
}

impl Conversation {
    /// Conversation for a mention posted outside a thread
    ///
    /// The raw event text becomes the only user message.
    pub fn from_mention(text: &str) -> Self {
        Self {
            system: None,
            history: vec![Message::user(text)],
        }
    }

    /// Conversation reconstructed from thread replies
    ///
    /// # Arguments
    ///
    /// * `replies` - Thread messages in chronological order
    /// * `bot_user_id` - User id of the bot installation
    /// * `app_id` - App id of the bot
    ///
    /// Bot messages tagged ignored are dropped, image messages become a
    /// `generated_image:` sentinel, and empty bot text is dropped. Other
    /// messages become user turns with a leading bot mention stripped. Only
    /// the most recent [`MAX_HISTORY_MESSAGES`] are kept.
    pub fn from_thread(replies: &[ThreadReply], bot_user_id: &str, app_id: &str) -> Self {
        let mention = mention_pattern(bot_user_id);

        let mut history: Vec<Message> = replies
            .iter()
            .filter_map(|reply| {
                if reply.is_authored_by(bot_user_id, app_id) {
                    bot_message(reply)
                } else {
                    let text = match &mention {
                        Some(pattern) => pattern.replace(&reply.text, ""),
                        None => reply.text.as_str().into(),
                    };
                    Some(Message::user(text.trim()))
                }
            })
            .collect();

        if history.len() > MAX_HISTORY_MESSAGES {
            history.drain(..history.len() - MAX_HISTORY_MESSAGES);
        }

        Self {
            system: None,
            history,
        }
    }

    /// Sets the persona's system prompt
    pub fn with_persona(mut self, persona: &Persona) -> Self {
        self.system = Some(Message::system(format!(
            "{}\n{}",
            persona.prompt, COMMON_PROMPT
        )));
        self
    }

    /// Messages in prompt order, system message first
    pub fn messages(&self) -> Vec<Message> {
        self.system
            .iter()
            .chain(self.history.iter())
            .cloned()
            .collect()
    }

    /// Total number of prompt messages
    pub fn len(&self) -> usize {
        self.history.len() + usize::from(self.system.is_some())
    }

    /// Whether the prompt has no messages
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is the opening turn of a conversation
    ///
    /// True when the prompt is at most the system message plus one user
    /// message; the first reply is broadcast to the channel.
    pub fn is_first_turn(&self) -> bool {
        self.len() < 3
    }
}

fn mention_pattern(bot_user_id: &str) -> Option<Regex> {
    if bot_user_id.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)^<@{}>\s*", regex::escape(bot_user_id))).ok()
}

fn bot_message(reply: &ThreadReply) -> Option<Message> {
    let content = match reply.reply_metadata() {
        Some(ReplyMetadata::Ignored) => return None,
        Some(ReplyMetadata::Image { prompt }) => format!("{}{}", GENERATED_IMAGE_PREFIX, prompt),
        Some(ReplyMetadata::Text) | None => reply.text.clone(),
    };
    if content.is_empty() {
        return None;
    }
    Some(Message {
        role: Role::Assistant,
        content,
    })
}
