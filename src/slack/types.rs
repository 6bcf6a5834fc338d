//! Slack payload and message types
//!
//! Inbound Events API payloads, thread replies, the reply metadata tag the
//! bot writes on its own messages, and the option structs for outbound
//! Web API calls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Event type written into the metadata of every bot message
pub const REPLY_METADATA_EVENT_TYPE: &str = "chatsdj_reply";

/// Outer Events API envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Endpoint ownership handshake
    UrlVerification {
        /// Value to echo back
        challenge: String,
    },
    /// A subscribed event
    EventCallback(EventCallback),
    /// Any other envelope type
    #[serde(other)]
    Unknown,
}

/// Body of an `event_callback` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct EventCallback {
    /// Application that received the event
    #[serde(default)]
    pub api_app_id: String,
    /// Installations the event was delivered for
    #[serde(default)]
    pub authorizations: Vec<Authorization>,
    /// The event itself
    pub event: SlackEvent,
}

impl EventCallback {
    /// User id of the bot installation, taken from the first authorization
    pub fn bot_user_id(&self) -> Option<&str> {
        self.authorizations.first().map(|a| a.user_id.as_str())
    }
}

/// One installation authorization
#[derive(Debug, Clone, Deserialize)]
pub struct Authorization {
    /// Bot user id for the installation
    pub user_id: String,
}

/// Inner event of an `event_callback`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    /// The bot was mentioned
    AppMention(AppMentionEvent),
    /// Any other event type
    #[serde(other)]
    Other,
}

/// An `app_mention` event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppMentionEvent {
    /// Channel the mention was posted in
    pub channel: String,
    /// Raw message text, including the mention
    #[serde(default)]
    pub text: String,
    /// Timestamp of the mentioning message
    pub ts: String,
    /// Thread root, when the mention was posted inside a thread
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Author of the mention
    #[serde(default)]
    pub user: Option<String>,
}

impl AppMentionEvent {
    /// Timestamp of the thread the reply belongs in
    ///
    /// A mention outside a thread starts a new thread rooted at itself.
    pub fn reply_thread_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// Raw Slack message metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackMetadata {
    /// Application defined event type
    pub event_type: String,
    /// Application defined payload
    #[serde(default)]
    pub event_payload: serde_json::Value,
}

/// Tag describing how a bot message replays into prompt history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMetadata {
    /// Placeholder or error text; never replayed
    Ignored,
    /// Model generated text
    Text,
    /// A generated image and the prompt that produced it
    Image {
        /// Image prompt
        prompt: String,
    },
}

impl ReplyMetadata {
    /// Converts to the Slack metadata envelope
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::slack::ReplyMetadata;
    ///
    /// let metadata = ReplyMetadata::Ignored.to_slack();
    /// assert_eq!(metadata.event_type, "chatsdj_reply");
    /// assert_eq!(metadata.event_payload["ignored"], true);
    /// ```
    pub fn to_slack(&self) -> SlackMetadata {
        let event_payload = match self {
            Self::Ignored => serde_json::json!({ "ignored": true }),
            Self::Text => serde_json::json!({ "ignored": false }),
            Self::Image { prompt } => serde_json::json!({ "ignored": false, "image": prompt }),
        };
        SlackMetadata {
            event_type: REPLY_METADATA_EVENT_TYPE.to_string(),
            event_payload,
        }
    }

    /// Reads a tag from Slack metadata
    ///
    /// Returns `None` when the metadata was not written by this bot or its
    /// payload is not recognizable.
    pub fn from_slack(metadata: &SlackMetadata) -> Option<Self> {
        if metadata.event_type != REPLY_METADATA_EVENT_TYPE {
            return None;
        }
        let payload = metadata.event_payload.as_object()?;
        if payload.get("ignored").and_then(|v| v.as_bool()) == Some(true) {
            return Some(Self::Ignored);
        }
        match payload
            .get("image")
            .and_then(|v| v.as_str())
            .filter(|prompt| !prompt.is_empty())
        {
            Some(prompt) => Some(Self::Image {
                prompt: prompt.to_string(),
            }),
            None if payload.contains_key("ignored") || payload.contains_key("image") => {
                Some(Self::Text)
            }
            None => None,
        }
    }

    /// Serializes the Slack envelope as the JSON string the Web API expects
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.to_slack()).unwrap_or_default()
    }
}

/// A message returned by `conversations.replies`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThreadReply {
    /// Message timestamp
    #[serde(default)]
    pub ts: String,
    /// Author user id
    #[serde(default)]
    pub user: Option<String>,
    /// Authoring app id, set for bot messages
    #[serde(default)]
    pub app_id: Option<String>,
    /// Message text
    #[serde(default)]
    pub text: String,
    /// Message metadata, when requested and present
    #[serde(default)]
    pub metadata: Option<SlackMetadata>,
}

impl ThreadReply {
    /// Whether the reply was authored by the bot user or the bot's app
    pub fn is_authored_by(&self, bot_user_id: &str, app_id: &str) -> bool {
        self.user.as_deref() == Some(bot_user_id)
            || (!app_id.is_empty() && self.app_id.as_deref() == Some(app_id))
    }

    /// The reply's bot metadata tag, if any
    pub fn reply_metadata(&self) -> Option<ReplyMetadata> {
        self.metadata.as_ref().and_then(ReplyMetadata::from_slack)
    }
}

/// Options for `chat.postMessage`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostMessageOptions {
    /// Thread to post into
    pub thread_ts: Option<String>,
    /// Also show the reply in the channel
    pub reply_broadcast: bool,
    /// Display name override
    pub username: Option<String>,
    /// Emoji icon override
    pub icon_emoji: Option<String>,
    /// Metadata tag
    pub metadata: Option<ReplyMetadata>,
}

/// Options for `chat.update`
///
/// Only fields that are set are sent; a broadcast cannot be combined with a
/// content change in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateMessageOptions {
    /// Replacement text
    pub text: Option<String>,
    /// Replacement metadata
    pub metadata: Option<ReplyMetadata>,
    /// Broadcast the reply to the channel
    pub reply_broadcast: Option<bool>,
}

impl UpdateMessageOptions {
    /// Text replacement with metadata
    pub fn text(text: impl Into<String>, metadata: ReplyMetadata) -> Self {
        Self {
            text: Some(text.into()),
            metadata: Some(metadata),
            reply_broadcast: None,
        }
    }

    /// Broadcast only
    pub fn broadcast() -> Self {
        Self {
            reply_broadcast: Some(true),
            ..Default::default()
        }
    }
}

/// A message created by `chat.postMessage`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostedMessage {
    /// Channel id
    pub channel: String,
    /// Message timestamp
    pub ts: String,
}

/// One share of an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileShare {
    /// Timestamp of the message carrying the file
    pub ts: String,
}

/// Where an uploaded file was shared, keyed by channel id
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileShares {
    /// Shares in public channels
    #[serde(default)]
    pub public: HashMap<String, Vec<FileShare>>,
    /// Shares in private channels and DMs
    #[serde(default)]
    pub private: HashMap<String, Vec<FileShare>>,
}

/// File object returned by `files.upload`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
    /// File id
    #[serde(default)]
    pub id: String,
    /// Whether the file was shared to a public channel
    #[serde(default)]
    pub is_public: bool,
    /// Public channels the file was shared to
    #[serde(default)]
    pub channels: Vec<String>,
    /// Private channels the file was shared to
    #[serde(default)]
    pub groups: Vec<String>,
    /// Private conversations the file was shared to
    #[serde(default)]
    pub ims: Vec<String>,
    /// Share details
    #[serde(default)]
    pub shares: FileShares,
}

impl UploadedFile {
    /// First channel the file was shared to
    pub fn shared_channel(&self) -> Option<&str> {
        self.channels
            .first()
            .or_else(|| self.groups.first())
            .or_else(|| self.ims.first())
            .map(String::as_str)
    }

    /// Channel and message timestamp of the first share
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::slack::UploadedFile;
    ///
    /// let file: UploadedFile = serde_json::from_value(serde_json::json!({
    ///     "id": "F1",
    ///     "is_public": true,
    ///     "channels": ["C1"],
    ///     "shares": {"public": {"C1": [{"ts": "1700000000.000200"}]}}
    /// }))
    /// .unwrap();
    /// assert_eq!(file.share_location(), Some(("C1", "1700000000.000200")));
    /// ```
    pub fn share_location(&self) -> Option<(&str, &str)> {
        let channel = self.shared_channel()?;
        let shares = if self.is_public {
            &self.shares.public
        } else {
            &self.shares.private
        };
        let share = shares.get(channel)?.first()?;
        Some((channel, share.ts.as_str()))
    }
}
