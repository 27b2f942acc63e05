//! Azure OpenAI provider: deployment-routed endpoints and mandatory auth.

use super::{sse, Provider};
use crate::config::ProviderConfig;
use crate::protocol::Protocol;
use crate::response::StreamingChunk;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How requests authenticate against Azure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AzureAuth {
    /// `api-key` header carrying the resource key.
    ApiKey,
    /// `Authorization: Bearer` with an Entra ID token.
    Bearer,
}

/// Provider for Azure OpenAI deployments.
///
/// Unlike local backends, every required field is validated at
/// construction: a missing deployment, auth type, token, or API version is
/// a configuration error, not a runtime surprise.
#[derive(Debug)]
pub struct AzureProvider {
    name: String,
    base_url: String,
    deployment: String,
    auth: AzureAuth,
    token: String,
    api_version: String,
}

impl AzureProvider {
    /// Builds the provider from configuration, validating all required
    /// options.
    pub fn new(cfg: &ProviderConfig) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            cfg.options
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| Error::config(format!("{key} is required for the azure provider")))
        };

        let deployment = required("deployment")?;
        let auth = match required("auth_type")?.as_str() {
            "api_key" => AzureAuth::ApiKey,
            "bearer" => AzureAuth::Bearer,
            other => {
                return Err(Error::config(format!(
                    "unknown auth_type {other:?} for the azure provider"
                )))
            }
        };
        let token = required("token")?;
        let api_version = required("api_version")?;

        Ok(Self {
            name: cfg.name.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            deployment,
            auth,
            token,
            api_version,
        })
    }

    /// Registry factory.
    pub(super) fn factory(cfg: &ProviderConfig) -> Result<Arc<dyn Provider>> {
        Ok(Arc::new(Self::new(cfg)?))
    }
}

#[async_trait]
impl Provider for AzureProvider {
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
        Ok(format!(
            "{}/deployments/{}{}?api-version={}",
            self.base_url, self.deployment, path, self.api_version
        ))
    }

    fn set_headers(&self, headers: &mut HashMap<String, String>) {
        match self.auth {
            AzureAuth::ApiKey => {
                headers.insert("api-key".to_string(), self.token.clone());
            }
            AzureAuth::Bearer => {
                headers.insert(
                    "Authorization".to_string(),
                    format!("Bearer {}", self.token),
                );
            }
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
        Ok(sse::spawn_event_decoder(response, protocol, cancel))
    }
}
