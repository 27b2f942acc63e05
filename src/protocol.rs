//! Protocol identifiers and conversation messages.
//!
//! A [`Protocol`] names one of the four supported LLM operation kinds and a
//! [`Message`] is one entry of a conversation. Both are pure data; the wire
//! representation is chosen later by a provider strategy.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of LLM operation a request performs.
///
/// Only `Chat`, `Vision`, and `Tools` support streaming responses;
/// `Embeddings` never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Standard text-based conversation.
    Chat,
    /// Image understanding with multimodal inputs.
    Vision,
    /// Function calling / tool use.
    Tools,
    /// Text vectorization for semantic search.
    Embeddings,
}

impl Protocol {
    /// All supported protocols, in declaration order.
    pub fn all() -> [Protocol; 4] {
        [
            Protocol::Chat,
            Protocol::Vision,
            Protocol::Tools,
            Protocol::Embeddings,
        ]
    }

    /// The lowercase wire/config name of the protocol.
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Chat => "chat",
            Protocol::Vision => "vision",
            Protocol::Tools => "tools",
            Protocol::Embeddings => "embeddings",
        }
    }

    /// True if the protocol can produce an incremental response stream.
    pub fn supports_streaming(self) -> bool {
        !matches!(self, Protocol::Embeddings)
    }

    /// Comma-separated list of all protocol names, for error messages.
    pub fn labels() -> String {
        Protocol::all()
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chat" => Ok(Protocol::Chat),
            "vision" => Ok(Protocol::Vision),
            "tools" => Ok(Protocol::Tools),
            "embeddings" => Ok(Protocol::Embeddings),
            other => Err(Error::config(format!(
                "unknown protocol {:?}, expected one of: {}",
                other,
                Protocol::labels()
            ))),
        }
    }
}

/// A single message in a conversation.
///
/// `content` is either plain text or a structured multimodal payload (text
/// segments interleaved with image references). Messages are never mutated
/// after construction; when a provider embeds images it produces a
/// transformed copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The sender role ("system", "user", "assistant", ...).
    pub role: String,
    /// Plain text or a structured content array.
    pub content: serde_json::Value,
}

impl Message {
    /// Creates a message with an arbitrary content value.
    pub fn new(role: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            role: role.into(),
            content,
        }
    }

    /// Creates a plain-text message.
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(role, serde_json::Value::String(text.into()))
    }

    /// Creates a plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::text("user", text)
    }

    /// Creates a plain-text system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::text("system", text)
    }

    /// Creates a plain-text assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text("assistant", text)
    }

    /// The content as plain text, or `None` if it is structured.
    pub fn text_content(&self) -> Option<&str> {
        self.content.as_str()
    }
}
