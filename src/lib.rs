//! # modelrelay
//!
//! A multi-protocol, multi-provider execution client for LLM backends.
//!
//! ## Overview
//!
//! modelrelay speaks four request protocols - chat, vision, tools, and
//! embeddings - against pluggable provider backends:
//! - Local OpenAI-compatible servers (Ollama, LM Studio, llama.cpp, vLLM)
//! - Azure OpenAI deployments
//! - Your own backends, registered at runtime
//!
//! ## Key Features
//!
//! - **Protocol-typed requests**: Chat, vision, tools, and embeddings each
//!   get a dedicated request type and a fully parsed response type
//! - **Provider strategies**: Endpoint routing, authentication, and wire
//!   marshaling live behind the [`Provider`] trait; the client never
//!   branches on the backend
//! - **Streaming**: Token-by-token chunk streams over SSE and NDJSON, with
//!   bounded buffering and cooperative cancellation
//! - **Retry logic**: Exponential backoff with jitter for transient
//!   failures; streaming calls fail fast instead
//! - **Health tracking**: A coarse flag reflecting the last request outcome
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modelrelay::{Client, ChatRequest, Message, Model, ProviderConfig, providers};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = providers::create(&ProviderConfig::default())?;
//!     let model = Arc::new(Model::new("llama3.1:8b"));
//!     let client = Client::with_defaults()?;
//!
//!     let request = ChatRequest::new(
//!         provider,
//!         model,
//!         vec![Message::user("What's the capital of France?")],
//!     );
//!
//!     let response = client.execute(&request, &CancellationToken::new()).await?;
//!     println!("{}", response.content());
//!     Ok(())
//! }
//! ```
//!
//! Streaming follows the same shape, with chunks arriving as a
//! [`ChunkStream`]:
//!
//! ```rust,no_run
//! # use modelrelay::{Client, ChatRequest, Message, Model, ProviderConfig, providers};
//! # use std::sync::Arc;
//! # use tokio_util::sync::CancellationToken;
//! use serde_json::json;
//! use tokio_stream::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let provider = providers::create(&ProviderConfig::default())?;
//! # let model = Arc::new(Model::new("llama3.1:8b"));
//! # let client = Client::with_defaults()?;
//! let request = ChatRequest::new(provider, model, vec![Message::user("Tell me a story")])
//!     .with_option("stream", json!(true));
//!
//! let mut stream = client.execute_stream(&request, &CancellationToken::new()).await?;
//! while let Some(chunk) = stream.next().await {
//!     if let Some(err) = chunk.error {
//!         eprintln!("stream failed: {err}");
//!         break;
//!     }
//!     print!("{}", chunk.content());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **protocol**: Protocol identifiers and conversation messages
//! - **config**: Client, retry, provider, and model configuration
//! - **model**: Runtime model descriptor with per-protocol default options
//! - **request**: Protocol-typed request objects behind the [`Request`] trait
//! - **providers**: Backend strategies, wire marshaling, and the registry
//! - **response**: Parsed response and streaming chunk types
//! - **client**: HTTP execution, retry orchestration, health tracking
//! - **retry**: Transient-failure classification and backoff
//! - **error**: The [`Error`] enum and [`Result`] alias

/// HTTP execution client: atomic and streaming protocol execution.
mod client;

/// Configuration types for the client, retry policy, providers, and models.
mod config;

/// Error types shared across the crate.
mod error;

/// Runtime model descriptor.
mod model;

/// Protocol identifiers and conversation messages.
mod protocol;

/// Protocol-typed request objects.
mod request;

/// Parsed responses and streaming chunks.
mod response;

/// Provider strategies and the provider registry.
pub mod providers;

/// Retry policy, public so applications can reuse the classification and
/// backoff for their own operations.
pub mod retry;

// --- Client ---

pub use client::{ChunkStream, Client};

// --- Configuration ---

pub use config::{ClientConfig, ModelConfig, OptionMap, ProviderConfig, RelayConfig, RetryConfig};

// --- Errors ---

pub use error::{Error, Result};

// --- Protocols and messages ---

pub use protocol::{Message, Protocol};

// --- Models ---

pub use model::Model;

// --- Providers ---

pub use providers::{
    AzureProvider, OllamaProvider, PreparedRequest, Provider, RequestData, ToolDefinition,
};

// --- Requests ---

pub use request::{ChatRequest, EmbeddingsRequest, Request, ToolsRequest, VisionRequest};

// --- Responses ---

pub use response::{
    ChatChoice, ChatResponse, ChunkChoice, Delta, Embedding, EmbeddingsResponse, Response,
    StreamingChunk, TokenUsage, ToolCall, ToolCallFunction, ToolsChoice, ToolsMessage,
    ToolsResponse,
};

/// Convenience module with the most commonly used types.
/// Import with `use modelrelay::prelude::*;`.
pub mod prelude {
    pub use crate::{
        ChatRequest, ChunkStream, Client, ClientConfig, EmbeddingsRequest, Error, Message, Model,
        Protocol, Provider, ProviderConfig, Request, Response, Result, StreamingChunk,
        ToolDefinition, ToolsRequest, VisionRequest,
    };
}
