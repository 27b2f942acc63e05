//! Local OpenAI-compatible provider (Ollama, LM Studio, llama.cpp, etc.).

use super::{sse, Provider};
use crate::config::{OptionMap, ProviderConfig};
use crate::protocol::Protocol;
use crate::response::StreamingChunk;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Provider for local backends exposing the OpenAI-compatible `/v1` API.
///
/// The base URL is normalized at construction: `http://localhost:11434`,
/// `http://localhost:11434/`, and `http://localhost:11434/v1` all resolve
/// to the same endpoints. Authentication is optional and driven by the
/// provider option map, since local proxies sometimes front these servers.
#[derive(Debug)]
pub struct OllamaProvider {
    name: String,
    base_url: String,
    options: OptionMap,
}

impl OllamaProvider {
    /// Builds the provider from configuration, normalizing the base URL to
    /// end in `/v1`.
    pub fn new(cfg: &ProviderConfig) -> Self {
        let trimmed = cfg.base_url.trim_end_matches('/');
        let base_url = if trimmed.ends_with("/v1") {
            trimmed.to_string()
        } else {
            format!("{trimmed}/v1")
        };
        Self {
            name: cfg.name.clone(),
            base_url,
            options: cfg.options.clone(),
        }
    }

    /// Registry factory.
    pub(super) fn factory(cfg: &ProviderConfig) -> Result<Arc<dyn Provider>> {
        Ok(Arc::new(Self::new(cfg)))
    }

    fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, protocol: Protocol) -> Result<String> {
        let path = match protocol {
            Protocol::Chat | Protocol::Vision | Protocol::Tools => "/chat/completions",
            Protocol::Embeddings => "/embeddings",
        };
        Ok(format!("{}{}", self.base_url, path))
    }

    fn set_headers(&self, headers: &mut HashMap<String, String>) {
        let Some(token) = self.option_str("token") else {
            return;
        };
        match self.option_str("auth_type") {
            Some("bearer") => {
                headers.insert("Authorization".to_string(), format!("Bearer {token}"));
            }
            Some("api_key") => {
                let header = self.option_str("auth_header").unwrap_or("X-API-Key");
                headers.insert(header.to_string(), token.to_string());
            }
            _ => {}
        }
    }

    fn process_stream_response(
        &self,
        response: reqwest::Response,
        protocol: Protocol,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamingChunk>> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown"),
                String::new(),
            ));
        }
        Ok(sse::spawn_line_decoder(response, protocol, cancel))
    }
}
