//! Provider strategies: endpoint routing, authentication, wire marshaling,
//! and response decoding per backend.
//!
//! Every backend is a [`Provider`] implementation; the execution client
//! stays protocol- and backend-agnostic by delegating all wire-format
//! decisions here. Adding a backend means adding a strategy, not a branch
//! in the client.
//!
//! Two strategies ship: [`OllamaProvider`] for local OpenAI-compatible
//! servers and [`AzureProvider`] for deployment-routed Azure OpenAI.
//! Both reuse the shared OpenAI-compatible marshaling via the trait's
//! default [`Provider::marshal`]; a backend with a different wire format
//! would override it.

mod azure;
mod ollama;
mod registry;
mod sse;
mod wire;

pub use azure::AzureProvider;
pub use ollama::OllamaProvider;
pub use registry::{create, list, register, Factory};

use crate::config::OptionMap;
use crate::protocol::{Message, Protocol};
use crate::response::{self, Response, StreamingChunk};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A fully prepared provider request: everything HTTP execution needs.
///
/// Decouples request preparation from the HTTP client that sends it.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// Complete endpoint URL including any query parameters.
    pub url: String,
    /// Protocol- and provider-specific headers.
    pub headers: HashMap<String, String>,
    /// Marshaled request body.
    pub body: Vec<u8>,
}

/// A provider-agnostic tool (function) definition. Providers transform
/// this generic shape into their wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Function name the model will call.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON-schema-like parameter description.
    pub parameters: serde_json::Value,
}

/// Payload for marshaling a chat request.
#[derive(Debug, Clone)]
pub struct ChatData {
    /// Model identifier.
    pub model: String,
    /// Conversation history.
    pub messages: Vec<Message>,
    /// Flattened model options.
    pub options: OptionMap,
}

/// Payload for marshaling a vision request.
#[derive(Debug, Clone)]
pub struct VisionData {
    /// Model identifier.
    pub model: String,
    /// Conversation history; the last message must be plain text.
    pub messages: Vec<Message>,
    /// Image URLs or base64 data URIs.
    pub images: Vec<String>,
    /// Per-image options embedded into each image block (e.g. detail).
    pub vision_options: OptionMap,
    /// Flattened model options.
    pub options: OptionMap,
}

/// Payload for marshaling a tools request.
#[derive(Debug, Clone)]
pub struct ToolsData {
    /// Model identifier.
    pub model: String,
    /// Conversation history.
    pub messages: Vec<Message>,
    /// Functions the model may call.
    pub tools: Vec<ToolDefinition>,
    /// Flattened model options.
    pub options: OptionMap,
}

/// Payload for marshaling an embeddings request.
#[derive(Debug, Clone)]
pub struct EmbeddingsData {
    /// Model identifier.
    pub model: String,
    /// Text to embed: a string or an array of strings.
    pub input: serde_json::Value,
    /// Flattened model options.
    pub options: OptionMap,
}

/// Protocol-specific payload handed to [`Provider::marshal`].
#[derive(Debug, Clone)]
pub enum RequestData {
    /// Chat payload.
    Chat(ChatData),
    /// Vision payload.
    Vision(VisionData),
    /// Tools payload.
    Tools(ToolsData),
    /// Embeddings payload.
    Embeddings(EmbeddingsData),
}

impl RequestData {
    /// The protocol this payload belongs to.
    pub fn protocol(&self) -> Protocol {
        match self {
            RequestData::Chat(_) => Protocol::Chat,
            RequestData::Vision(_) => Protocol::Vision,
            RequestData::Tools(_) => Protocol::Tools,
            RequestData::Embeddings(_) => Protocol::Embeddings,
        }
    }
}

/// Backend strategy: endpoint routing, auth, marshaling, and decoding for
/// one LLM service.
///
/// Implementations are immutable after construction and safely shared
/// across arbitrarily many concurrent requests.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// The provider identifier (registry name).
    fn name(&self) -> &str;

    /// The provider's base URL.
    fn base_url(&self) -> &str;

    /// Resolves the full endpoint URL for a protocol, or an
    /// [`Error::UnsupportedProtocol`] if this backend does not serve it.
    fn endpoint(&self, protocol: Protocol) -> Result<String>;

    /// Injects authentication and other provider headers. Called on a
    /// header map already cloned for this request, never on the caller's
    /// map.
    fn set_headers(&self, headers: &mut HashMap<String, String>);

    /// Converts a protocol payload into this backend's wire JSON.
    ///
    /// The default implementation produces the OpenAI-compatible format
    /// shared by both shipped providers.
    fn marshal(&self, data: &RequestData) -> Result<Vec<u8>> {
        wire::marshal(data)
    }

    /// Prepares a standard (non-streaming) request from a pre-marshaled
    /// body and caller headers.
    fn prepare_request(
        &self,
        protocol: Protocol,
        body: Vec<u8>,
        headers: &HashMap<String, String>,
    ) -> Result<PreparedRequest> {
        Ok(PreparedRequest {
            url: self.endpoint(protocol)?,
            headers: headers.clone(),
            body,
        })
    }

    /// Prepares a streaming request: like [`Provider::prepare_request`]
    /// but with event-stream headers added to a cloned header map.
    fn prepare_stream_request(
        &self,
        protocol: Protocol,
        body: Vec<u8>,
        headers: &HashMap<String, String>,
    ) -> Result<PreparedRequest> {
        // Clone before mutating so the caller's map is never aliased.
        let mut stream_headers = headers.clone();
        stream_headers.insert("Accept".to_string(), "text/event-stream".to_string());
        stream_headers.insert("Cache-Control".to_string(), "no-cache".to_string());
        Ok(PreparedRequest {
            url: self.endpoint(protocol)?,
            headers: stream_headers,
            body,
        })
    }

    /// Reads and decodes an atomic HTTP response.
    ///
    /// Non-2xx statuses become [`Error::Status`] with the body embedded
    /// for diagnostics; 2xx bodies are decoded per protocol.
    async fn process_response(
        &self,
        response: reqwest::Response,
        protocol: Protocol,
    ) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown"),
                body,
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::stream(format!("failed to read response body: {e}")))?;
        response::parse(protocol, &body)
    }

    /// Turns a live streaming HTTP response into a bounded queue of
    /// decoded chunks.
    ///
    /// Spawns exactly one decode worker which stops on body exhaustion,
    /// the backend's terminal marker, a hard read error (delivered as a
    /// final error chunk), or cancellation. The response body is closed
    /// whenever the worker exits.
    fn process_stream_response(
        &self,
        response: reqwest::Response,
        protocol: Protocol,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamingChunk>>;
}
