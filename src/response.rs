//! Typed response shapes and protocol-aware decoding.
//!
//! Atomic responses come in three shapes: chat and vision share
//! [`ChatResponse`], tool calling adds structured calls in
//! [`ToolsResponse`], and [`EmbeddingsResponse`] returns indexed vectors.
//! Streaming responses are sequences of independent [`StreamingChunk`]
//! values. All decoders are pure functions from raw bytes to typed values.

use crate::protocol::{Message, Protocol};
use crate::{Error, Result};
use serde::Deserialize;

/// Token consumption reported by the backend for one request/response
/// cycle.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens produced by the completion.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Total tokens billed.
    #[serde(default)]
    pub total_tokens: u32,
}

/// Response from a non-streaming chat or vision request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    /// Backend-assigned response id.
    #[serde(default)]
    pub id: String,
    /// Object tag (e.g. "chat.completion").
    #[serde(default)]
    pub object: String,
    /// Creation timestamp, seconds since epoch.
    #[serde(default)]
    pub created: i64,
    /// Model that produced the response.
    #[serde(default)]
    pub model: String,
    /// Generated choices; typically one.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Token usage, when the backend reports it.
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// One generated alternative in a chat response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// Position of this choice.
    #[serde(default)]
    pub index: u32,
    /// The generated message.
    pub message: Message,
    /// Why generation stopped, when reported.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Text content of the first choice. Structured content (e.g. vision
    /// payloads echoed back) is rendered as its JSON form; an empty
    /// response yields an empty string.
    pub fn content(&self) -> String {
        match self.choices.first() {
            Some(choice) => match choice.message.content.as_str() {
                Some(text) => text.to_string(),
                None => choice.message.content.to_string(),
            },
            None => String::new(),
        }
    }
}

/// Response from a tools (function calling) request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsResponse {
    /// Backend-assigned response id.
    #[serde(default)]
    pub id: String,
    /// Object tag.
    #[serde(default)]
    pub object: String,
    /// Creation timestamp, seconds since epoch.
    #[serde(default)]
    pub created: i64,
    /// Model that produced the response.
    #[serde(default)]
    pub model: String,
    /// Generated choices; typically one.
    #[serde(default)]
    pub choices: Vec<ToolsChoice>,
    /// Token usage, when the backend reports it.
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// One generated alternative in a tools response.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsChoice {
    /// Position of this choice.
    #[serde(default)]
    pub index: u32,
    /// The generated message, possibly carrying tool calls.
    pub message: ToolsMessage,
    /// Why generation stopped, when reported.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message in a tools response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsMessage {
    /// Sender role; "assistant" for model output.
    #[serde(default)]
    pub role: String,
    /// Text content accompanying the calls, often empty.
    #[serde(default)]
    pub content: Option<String>,
    /// Calls the model wants the caller to execute.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// A function call requested by the model. Execution is the caller's
/// responsibility; this crate only relays the request upward.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    /// Backend-assigned call id, echoed back with the result.
    pub id: String,
    /// Call kind; "function" for the OpenAI-compatible wire format.
    #[serde(rename = "type", default)]
    pub call_type: String,
    /// The function to call.
    pub function: ToolCallFunction,
}

/// The function named by a [`ToolCall`].
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallFunction {
    /// Function name.
    pub name: String,
    /// JSON-encoded arguments.
    #[serde(default)]
    pub arguments: String,
}

impl ToolsResponse {
    /// Tool calls requested in the first choice.
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.choices
            .first()
            .map(|c| c.message.tool_calls.as_slice())
            .unwrap_or_default()
    }
}

/// Response from an embeddings request: one vector per input item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingsResponse {
    /// Object tag (e.g. "list").
    #[serde(default)]
    pub object: String,
    /// One embedding per input, carrying its position.
    #[serde(default)]
    pub data: Vec<Embedding>,
    /// Model that produced the vectors.
    #[serde(default)]
    pub model: String,
    /// Token usage, when the backend reports it.
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// A single embedding vector with its input index.
#[derive(Debug, Clone, Deserialize)]
pub struct Embedding {
    /// The vector itself.
    pub embedding: Vec<f64>,
    /// Index of the input this vector belongs to.
    #[serde(default)]
    pub index: u32,
    /// Object tag (e.g. "embedding").
    #[serde(default)]
    pub object: String,
}

/// A parsed atomic response, tagged by the protocol family that produced
/// it.
#[derive(Debug, Clone)]
pub enum Response {
    /// Chat or vision completion.
    Chat(ChatResponse),
    /// Function-calling completion.
    Tools(ToolsResponse),
    /// Embedding vectors.
    Embeddings(EmbeddingsResponse),
}

impl Response {
    /// Text content of the response; empty for embeddings.
    pub fn content(&self) -> String {
        match self {
            Response::Chat(r) => r.content(),
            Response::Tools(r) => r
                .choices
                .first()
                .and_then(|c| c.message.content.clone())
                .unwrap_or_default(),
            Response::Embeddings(_) => String::new(),
        }
    }

    /// The chat response, if this is one.
    pub fn as_chat(&self) -> Option<&ChatResponse> {
        match self {
            Response::Chat(r) => Some(r),
            _ => None,
        }
    }

    /// The tools response, if this is one.
    pub fn as_tools(&self) -> Option<&ToolsResponse> {
        match self {
            Response::Tools(r) => Some(r),
            _ => None,
        }
    }

    /// The embeddings response, if this is one.
    pub fn as_embeddings(&self) -> Option<&EmbeddingsResponse> {
        match self {
            Response::Embeddings(r) => Some(r),
            _ => None,
        }
    }
}

/// A single chunk of a streaming response.
///
/// Chunks are independent; any accumulation across chunks is the caller's
/// responsibility. A chunk produced after a hard read failure carries the
/// error in `error` and is the last chunk delivered.
#[derive(Debug, Default, Deserialize)]
pub struct StreamingChunk {
    /// Backend-assigned response id.
    #[serde(default)]
    pub id: String,
    /// Object tag (e.g. "chat.completion.chunk").
    #[serde(default)]
    pub object: String,
    /// Creation timestamp, seconds since epoch.
    #[serde(default)]
    pub created: i64,
    /// Model producing the stream.
    #[serde(default)]
    pub model: String,
    /// Incremental choices; typically one.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Set when the stream failed mid-flight; always check before using
    /// the chunk's content.
    #[serde(skip)]
    pub error: Option<Error>,
}

/// One incremental choice within a streaming chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    /// Position of this choice.
    #[serde(default)]
    pub index: u32,
    /// The incremental content fragment.
    #[serde(default)]
    pub delta: Delta,
    /// Set on the final content chunk of a choice.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental message fragment inside a chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    /// Role, usually present only in the first chunk.
    #[serde(default)]
    pub role: Option<String>,
    /// Content fragment to append.
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamingChunk {
    /// The incremental content of the first choice, or an empty string.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .unwrap_or("")
    }

    /// Builds the terminal chunk carrying a stream failure.
    pub(crate) fn from_error(error: Error) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Parses an atomic response body for the given protocol.
pub fn parse(protocol: Protocol, body: &[u8]) -> Result<Response> {
    match protocol {
        Protocol::Chat | Protocol::Vision => serde_json::from_slice(body)
            .map(Response::Chat)
            .map_err(|e| Error::decode(format!("bad {protocol} response: {e}"))),
        Protocol::Tools => serde_json::from_slice(body)
            .map(Response::Tools)
            .map_err(|e| Error::decode(format!("bad tools response: {e}"))),
        Protocol::Embeddings => serde_json::from_slice(body)
            .map(Response::Embeddings)
            .map_err(|e| Error::decode(format!("bad embeddings response: {e}"))),
    }
}

/// Parses one streaming chunk payload for the given protocol.
///
/// Chat, vision, and tools share the delta chunk shape; embeddings never
/// streams.
pub fn parse_stream_chunk(protocol: Protocol, data: &[u8]) -> Result<StreamingChunk> {
    match protocol {
        Protocol::Chat | Protocol::Vision | Protocol::Tools => serde_json::from_slice(data)
            .map_err(|e| Error::decode(format!("bad {protocol} stream chunk: {e}"))),
        Protocol::Embeddings => Err(Error::StreamingUnsupported(protocol)),
    }
}
