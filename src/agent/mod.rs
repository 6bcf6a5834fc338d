//! Agent module for chatsdj
//!
//! This module contains the counsellor turn logic, including prompt history
//! reconstruction and draft message reconciliation.

pub mod conversation;
pub mod core;
pub mod reply;

pub use conversation::Conversation;
pub use core::{image_generation_tool, Counsellor, MentionContext};
pub use reply::{DraftMessage, Replier, ReplyHandler};
