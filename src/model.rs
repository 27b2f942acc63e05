//! Runtime model descriptor.
//!
//! A [`Model`] is the domain-side view of a configured model: its name plus
//! per-protocol default option maps. It is built once from a
//! [`ModelConfig`](crate::config::ModelConfig) and shared read-only across
//! requests.

use crate::config::{ModelConfig, OptionMap};
use crate::protocol::Protocol;
use std::collections::HashMap;

/// A configured model and its per-protocol default options.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Model identifier (e.g. "gpt-4o", "llama3.1:8b").
    pub name: String,
    /// Default option maps keyed by protocol.
    pub options: HashMap<Protocol, OptionMap>,
}

impl Model {
    /// Creates a model with no default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: HashMap::new(),
        }
    }

    /// Builds a model from configuration, converting string protocol keys to
    /// [`Protocol`] values. Unknown protocol names are skipped with a
    /// warning rather than failing the whole model.
    pub fn from_config(cfg: &ModelConfig) -> Self {
        let mut options = HashMap::new();
        for (name, opts) in &cfg.capabilities {
            match name.parse::<Protocol>() {
                Ok(protocol) => {
                    options.insert(protocol, opts.clone());
                }
                Err(_) => {
                    tracing::warn!(capability = %name, model = %cfg.name, "ignoring unknown protocol capability");
                }
            }
        }
        Self {
            name: cfg.name.clone(),
            options,
        }
    }

    /// Returns the default options for a protocol, or an empty map if none
    /// are configured.
    pub fn options_for(&self, protocol: Protocol) -> OptionMap {
        self.options.get(&protocol).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_config_converts_protocol_keys() {
        let cfg: ModelConfig = serde_json::from_value(json!({
            "name": "llama3.1:8b",
            "capabilities": {
                "chat": {"temperature": 0.7},
                "embeddings": {"dimensions": 1024},
                "telepathy": {"enabled": true}
            }
        }))
        .unwrap();

        let model = Model::from_config(&cfg);
        assert_eq!(model.name, "llama3.1:8b");
        assert_eq!(model.options_for(Protocol::Chat)["temperature"], 0.7);
        assert_eq!(model.options_for(Protocol::Embeddings)["dimensions"], 1024);
        // The unknown capability is dropped, not an error.
        assert_eq!(model.options.len(), 2);
    }

    #[test]
    fn test_options_for_missing_protocol_is_empty() {
        let model = Model::new("test-model");
        assert!(model.options_for(Protocol::Vision).is_empty());
    }
}
