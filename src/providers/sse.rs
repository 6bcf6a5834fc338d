//! Server-sent event decoding for streamed chat completions
//!
//! [`SseLineBuffer`] turns raw network chunks into complete lines, and
//! [`StreamDecoder`] folds `data:` payloads into text previews and the single
//! terminal [`StreamingResponse`].

use crate::error::{ChatsdjError, Result};
use crate::providers::base::{StreamingResponse, ToolInvocation};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Number of content deltas between two text previews
pub const PREVIEW_BATCH_SIZE: usize = 20;

/// Payload marking the end of the stream
pub const DONE_MARKER: &str = "[DONE]";

/// Accumulates raw bytes and yields complete lines
///
/// Bytes are kept until a newline arrives, so frames and multi-byte UTF-8
/// characters split across chunks are reassembled before decoding.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    /// Creates an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and drains every complete line
    ///
    /// Trailing `\r` is removed from each line.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatsdj::providers::sse::SseLineBuffer;
    ///
    /// let mut buffer = SseLineBuffer::new();
    /// assert!(buffer.push(b"data: {\"a\"").is_empty());
    /// assert_eq!(buffer.push(b":1}\n\n"), vec!["data: {\"a\":1}".to_string(), String::new()]);
    /// ```
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Returns the unterminated remainder, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
        Some(line)
    }
}

/// Extracts the payload of a `data:` line
///
/// Returns `None` for blank lines, comments, and other SSE fields.
///
/// # Examples
///
/// ```
/// use chatsdj::providers::sse::data_payload;
///
/// assert_eq!(data_payload("data: [DONE]"), Some("[DONE]"));
/// assert_eq!(data_payload(": keep-alive"), None);
/// assert_eq!(data_payload("event: message"), None);
/// ```
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(|rest| rest.trim())
}

#[derive(Debug, Deserialize)]
struct ChunkFrame {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallFragment>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallFragment {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    function: Option<FunctionFragment>,
}

#[derive(Debug, Deserialize)]
struct FunctionFragment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    name: String,
    arguments: String,
}

/// Folds decoded payloads into streaming responses
#[derive(Debug, Default)]
pub struct StreamDecoder {
    message: String,
    pending_deltas: usize,
    tool_calls: BTreeMap<u32, PendingToolCall>,
    done: bool,
}

impl StreamDecoder {
    /// Creates a decoder with empty buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the end-of-stream marker has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Processes one `data:` payload
    ///
    /// # Returns
    ///
    /// Returns a text preview when the number of content deltas since the
    /// last preview reaches [`PREVIEW_BATCH_SIZE`], otherwise `None`
    ///
    /// # Errors
    ///
    /// Returns `ChatsdjError::Protocol` if the payload is not a valid chunk
    pub fn push_payload(&mut self, payload: &str) -> Result<Option<StreamingResponse>> {
        if payload == DONE_MARKER {
            self.done = true;
            return Ok(None);
        }

        let frame: ChunkFrame = serde_json::from_str(payload).map_err(|e| {
            ChatsdjError::Protocol(format!("Malformed completion frame: {} ({})", e, payload))
        })?;

        let Some(choice) = frame.choices.into_iter().next() else {
            return Ok(None);
        };

        if let Some(fragments) = choice.delta.tool_calls {
            for fragment in fragments {
                let entry = self.tool_calls.entry(fragment.index).or_default();
                if let Some(function) = fragment.function {
                    if let Some(name) = function.name {
                        entry.name = name;
                    }
                    if let Some(arguments) = function.arguments {
                        entry.arguments.push_str(&arguments);
                    }
                }
            }
            return Ok(None);
        }

        match choice.delta.content {
            Some(content) if !content.is_empty() => {
                self.message.push_str(&content);
                self.pending_deltas += 1;
                if self.pending_deltas >= PREVIEW_BATCH_SIZE {
                    self.pending_deltas = 0;
                    return Ok(Some(StreamingResponse::Text {
                        message: self.message.clone(),
                        is_completed: false,
                    }));
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Produces the terminal response
    ///
    /// # Errors
    ///
    /// Returns `ChatsdjError::Protocol` if accumulated tool arguments are not
    /// valid JSON
    pub fn finish(self) -> Result<StreamingResponse> {
        if self.tool_calls.len() > 1 {
            tracing::warn!(
                "Model requested {} tool calls; only the first is executed",
                self.tool_calls.len()
            );
        }

        let Some((_, call)) = self.tool_calls.into_iter().next() else {
            return Ok(StreamingResponse::Text {
                message: self.message,
                is_completed: true,
            });
        };

        let arguments = if call.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&call.arguments).map_err(|e| {
                ChatsdjError::Protocol(format!(
                    "Invalid arguments for tool '{}': {}",
                    call.name, e
                ))
            })?
        };

        Ok(StreamingResponse::Tool(ToolInvocation {
            name: call.name,
            arguments,
        }))
    }
}
