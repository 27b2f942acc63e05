//! Protocol-typed request objects.
//!
//! A request binds a provider, a model, and a protocol payload. It knows
//! its own headers and how to marshal itself (by delegating to the
//! provider's wire format), so the execution client can treat all four
//! protocols uniformly through the [`Request`] trait.
//!
//! Options resolve in two layers: the model's per-protocol defaults are
//! applied first, then per-request overrides set with `with_option`.

use crate::config::OptionMap;
use crate::model::Model;
use crate::protocol::{Message, Protocol};
use crate::providers::{
    ChatData, EmbeddingsData, Provider, RequestData, ToolDefinition, ToolsData, VisionData,
};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// An executable request for one protocol against one provider and model.
pub trait Request: Send + Sync {
    /// The protocol this request speaks.
    fn protocol(&self) -> Protocol;

    /// The provider strategy that will serve it.
    fn provider(&self) -> &Arc<dyn Provider>;

    /// The target model.
    fn model(&self) -> &Arc<Model>;

    /// Base headers for the request.
    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    /// Marshals the payload into the provider's wire format.
    fn marshal(&self) -> Result<Vec<u8>>;
}

/// A plain conversational completion request.
pub struct ChatRequest {
    provider: Arc<dyn Provider>,
    model: Arc<Model>,
    messages: Vec<Message>,
    options: OptionMap,
}

impl ChatRequest {
    /// Creates a chat request seeded with the model's chat options.
    pub fn new(provider: Arc<dyn Provider>, model: Arc<Model>, messages: Vec<Message>) -> Self {
        let options = model.options_for(Protocol::Chat);
        Self {
            provider,
            model,
            messages,
            options,
        }
    }

    /// Sets or overrides a single request option.
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

impl Request for ChatRequest {
    fn protocol(&self) -> Protocol {
        Protocol::Chat
    }

    fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    fn model(&self) -> &Arc<Model> {
        &self.model
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        self.provider.marshal(&RequestData::Chat(ChatData {
            model: self.model.name.clone(),
            messages: self.messages.clone(),
            options: self.options.clone(),
        }))
    }
}

/// A completion request carrying images alongside the conversation.
pub struct VisionRequest {
    provider: Arc<dyn Provider>,
    model: Arc<Model>,
    messages: Vec<Message>,
    images: Vec<String>,
    vision_options: OptionMap,
    options: OptionMap,
}

impl VisionRequest {
    /// Creates a vision request seeded with the model's vision options.
    ///
    /// Images are URLs or base64 data URIs; the last message must be plain
    /// text, which marshaling rewrites into a text-plus-images block array.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: Arc<Model>,
        messages: Vec<Message>,
        images: Vec<String>,
    ) -> Self {
        let options = model.options_for(Protocol::Vision);
        Self {
            provider,
            model,
            messages,
            images,
            vision_options: OptionMap::new(),
            options,
        }
    }

    /// Sets or overrides a single request option.
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Sets per-image options embedded into each image block (e.g.
    /// `detail`).
    pub fn with_vision_option(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.vision_options.insert(key.into(), value);
        self
    }
}

impl Request for VisionRequest {
    fn protocol(&self) -> Protocol {
        Protocol::Vision
    }

    fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    fn model(&self) -> &Arc<Model> {
        &self.model
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        self.provider.marshal(&RequestData::Vision(VisionData {
            model: self.model.name.clone(),
            messages: self.messages.clone(),
            images: self.images.clone(),
            vision_options: self.vision_options.clone(),
            options: self.options.clone(),
        }))
    }
}

/// A completion request offering functions the model may call.
pub struct ToolsRequest {
    provider: Arc<dyn Provider>,
    model: Arc<Model>,
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
    options: OptionMap,
}

impl ToolsRequest {
    /// Creates a tools request seeded with the model's tools options.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: Arc<Model>,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        let options = model.options_for(Protocol::Tools);
        Self {
            provider,
            model,
            messages,
            tools,
            options,
        }
    }

    /// Sets or overrides a single request option.
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

impl Request for ToolsRequest {
    fn protocol(&self) -> Protocol {
        Protocol::Tools
    }

    fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    fn model(&self) -> &Arc<Model> {
        &self.model
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        self.provider.marshal(&RequestData::Tools(ToolsData {
            model: self.model.name.clone(),
            messages: self.messages.clone(),
            tools: self.tools.clone(),
            options: self.options.clone(),
        }))
    }
}

/// A request to embed one text or a batch of texts.
pub struct EmbeddingsRequest {
    provider: Arc<dyn Provider>,
    model: Arc<Model>,
    input: serde_json::Value,
    options: OptionMap,
}

impl EmbeddingsRequest {
    /// Creates an embeddings request for a single input text.
    pub fn new(provider: Arc<dyn Provider>, model: Arc<Model>, input: impl Into<String>) -> Self {
        Self::with_input(provider, model, serde_json::Value::String(input.into()))
    }

    /// Creates an embeddings request for a batch of input texts.
    pub fn batch(provider: Arc<dyn Provider>, model: Arc<Model>, inputs: Vec<String>) -> Self {
        let input = serde_json::Value::Array(
            inputs.into_iter().map(serde_json::Value::String).collect(),
        );
        Self::with_input(provider, model, input)
    }

    fn with_input(provider: Arc<dyn Provider>, model: Arc<Model>, input: serde_json::Value) -> Self {
        let options = model.options_for(Protocol::Embeddings);
        Self {
            provider,
            model,
            input,
            options,
        }
    }

    /// Sets or overrides a single request option.
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

impl Request for EmbeddingsRequest {
    fn protocol(&self) -> Protocol {
        Protocol::Embeddings
    }

    fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    fn model(&self) -> &Arc<Model> {
        &self.model
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        self.provider
            .marshal(&RequestData::Embeddings(EmbeddingsData {
                model: self.model.name.clone(),
                input: self.input.clone(),
                options: self.options.clone(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, ProviderConfig};
    use crate::providers::create;
    use serde_json::json;

    fn provider() -> Arc<dyn Provider> {
        let cfg: ProviderConfig = serde_json::from_value(json!({
            "name": "ollama",
            "base_url": "http://localhost:11434",
        }))
        .unwrap();
        create(&cfg).unwrap()
    }

    fn model() -> Arc<Model> {
        let cfg: ModelConfig = serde_json::from_value(json!({
            "name": "llama3.1:8b",
            "capabilities": {
                "chat": {"temperature": 0.2},
            }
        }))
        .unwrap();
        Arc::new(Model::from_config(&cfg))
    }

    #[test]
    fn test_chat_request_inherits_model_options() {
        let request = ChatRequest::new(provider(), model(), vec![Message::user("hi")]);
        let body: serde_json::Value = serde_json::from_slice(&request.marshal().unwrap()).unwrap();
        assert_eq!(body["model"], "llama3.1:8b");
        assert_eq!(body["temperature"], 0.2);
    }

    #[test]
    fn test_request_option_overrides_model_default() {
        let request = ChatRequest::new(provider(), model(), vec![Message::user("hi")])
            .with_option("temperature", json!(0.9));
        let body: serde_json::Value = serde_json::from_slice(&request.marshal().unwrap()).unwrap();
        assert_eq!(body["temperature"], 0.9);
    }

    #[test]
    fn test_default_headers_are_json() {
        let request = ChatRequest::new(provider(), model(), vec![Message::user("hi")]);
        assert_eq!(request.headers()["Content-Type"], "application/json");
    }

    #[test]
    fn test_embeddings_batch_input_shape() {
        let request = EmbeddingsRequest::batch(
            provider(),
            model(),
            vec!["first".to_string(), "second".to_string()],
        );
        let body: serde_json::Value = serde_json::from_slice(&request.marshal().unwrap()).unwrap();
        assert_eq!(body["input"], json!(["first", "second"]));
    }

    #[test]
    fn test_vision_request_marshals_image_blocks() {
        let request = VisionRequest::new(
            provider(),
            model(),
            vec![Message::user("describe")],
            vec!["https://example.com/a.png".to_string()],
        )
        .with_vision_option("detail", json!("low"));
        let body: serde_json::Value = serde_json::from_slice(&request.marshal().unwrap()).unwrap();
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["detail"],
            "low"
        );
        assert_eq!(body["messages"][0]["content"][0]["text"], "describe");
    }
}
