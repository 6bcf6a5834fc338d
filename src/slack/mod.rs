//! Slack platform integration
//!
//! The [`SlackApi`] trait is the platform seam the counsellor drives;
//! [`SlackWebClient`] implements it over the Slack Web API. Inbound webhook
//! requests are authenticated with [`verify_request`].

pub mod client;
pub mod types;
pub mod verify;

pub use client::SlackWebClient;
pub use types::{
    AppMentionEvent, EventCallback, EventPayload, PostMessageOptions, PostedMessage,
    ReplyMetadata, SlackEvent, SlackMetadata, ThreadReply, UpdateMessageOptions, UploadedFile,
};
pub use verify::verify_request;

use crate::error::Result;
use async_trait::async_trait;

/// Slack Web API operations used during a turn
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Fetches every reply of a thread, root included, with metadata
    async fn fetch_thread_replies(&self, channel: &str, thread_ts: &str)
        -> Result<Vec<ThreadReply>>;

    /// Posts a new message
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        options: PostMessageOptions,
    ) -> Result<PostedMessage>;

    /// Updates an existing message in place
    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        options: UpdateMessageOptions,
    ) -> Result<()>;

    /// Deletes a message
    async fn delete_message(&self, channel: &str, ts: &str) -> Result<()>;

    /// Uploads an image and shares it into a channel or thread
    async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        title: &str,
        channel: &str,
        thread_ts: Option<&str>,
    ) -> Result<UploadedFile>;
}
