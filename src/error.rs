//! Error types for the execution client.
//!
//! Every failure surfaced by this crate is an [`Error`] variant. The variants
//! mirror the phases of a request (marshal, prepare, send, decode) so callers
//! can diagnose a failure without inspecting the wire, and so the retry layer
//! can classify transient failures (see [`crate::retry::is_retryable`]).

use crate::protocol::Protocol;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the execution client.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure (connection refused, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization failure while building a request body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or incomplete configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Payload shape mismatch while marshaling a request.
    #[error("failed to marshal request: {0}")]
    Marshal(String),

    /// The provider does not serve the requested protocol.
    #[error("protocol {protocol} not supported by {provider}")]
    UnsupportedProtocol {
        /// Provider name.
        provider: String,
        /// The protocol that was requested.
        protocol: Protocol,
    },

    /// The protocol never produces incremental responses.
    #[error("protocol {0} does not support streaming")]
    StreamingUnsupported(Protocol),

    /// The server responded with a non-2xx status.
    ///
    /// Distinguishes "the server refused" from "the network failed", which
    /// drives the retry decision. The response body is carried verbatim for
    /// diagnostics.
    #[error("HTTP {code} {status}: {body}")]
    Status {
        /// Numeric status code.
        code: u16,
        /// Canonical status text (e.g. "Service Unavailable").
        status: String,
        /// Raw response body.
        body: String,
    },

    /// Malformed response payload.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Failure while reading or decoding a streaming response body.
    #[error("streaming error: {0}")]
    Stream(String),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// All retry attempts were used up; carries the last attempt's error.
    #[error("max retries ({attempts}) exceeded: {source}")]
    RetriesExhausted {
        /// Number of retries that were configured.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a new config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new marshal error.
    pub fn marshal(msg: impl Into<String>) -> Self {
        Error::Marshal(msg.into())
    }

    /// Create a new decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Create a new stream error.
    pub fn stream(msg: impl Into<String>) -> Self {
        Error::Stream(msg.into())
    }

    /// Build a status error from a response status and body.
    pub fn status(code: u16, status: impl Into<String>, body: impl Into<String>) -> Self {
        Error::Status {
            code,
            status: status.into(),
            body: body.into(),
        }
    }

    /// True if this error was caused by caller cancellation, letting callers
    /// branch on "I cancelled this" vs. "it failed".
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::RetriesExhausted { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Status code carried by this error, if it is an HTTP status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { code, .. } => Some(*code),
            Error::RetriesExhausted { source, .. } => source.status_code(),
            _ => None,
        }
    }
}
