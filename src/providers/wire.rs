//! Default OpenAI-compatible wire marshaling shared by providers.
//!
//! Requests flatten the model name, the protocol payload, and the option
//! map into a single JSON object. Options are merged last, so an explicit
//! option can override a payload key.

use super::{ChatData, EmbeddingsData, RequestData, ToolsData, VisionData};
use crate::config::OptionMap;
use crate::protocol::Message;
use crate::{Error, Result};
use serde_json::{json, Value};

/// Marshals a protocol payload into OpenAI-compatible JSON.
pub(super) fn marshal(data: &RequestData) -> Result<Vec<u8>> {
    match data {
        RequestData::Chat(d) => marshal_chat(d),
        RequestData::Vision(d) => marshal_vision(d),
        RequestData::Tools(d) => marshal_tools(d),
        RequestData::Embeddings(d) => marshal_embeddings(d),
    }
}

fn combine(model: &str, fields: Vec<(&str, Value)>, options: &OptionMap) -> Result<Vec<u8>> {
    let mut combined = serde_json::Map::new();
    combined.insert("model".to_string(), Value::String(model.to_string()));
    for (key, value) in fields {
        combined.insert(key.to_string(), value);
    }
    for (key, value) in options {
        combined.insert(key.clone(), value.clone());
    }
    Ok(serde_json::to_vec(&Value::Object(combined))?)
}

fn marshal_chat(d: &ChatData) -> Result<Vec<u8>> {
    combine(
        &d.model,
        vec![("messages", serde_json::to_value(&d.messages)?)],
        &d.options,
    )
}

/// Vision marshaling rewrites the last message's text content into a
/// structured array: one text block followed by one `image_url` block per
/// image, each image block carrying the embedded vision options. The
/// original messages are untouched; a transformed copy is serialized.
fn marshal_vision(d: &VisionData) -> Result<Vec<u8>> {
    if d.messages.is_empty() {
        return Err(Error::marshal("messages cannot be empty for vision requests"));
    }
    if d.images.is_empty() {
        return Err(Error::marshal("images cannot be empty for vision requests"));
    }

    let last = d.messages.last().expect("checked non-empty");
    let Some(text) = last.text_content() else {
        return Err(Error::marshal(
            "last message content must be plain text for vision transformation",
        ));
    };

    let mut content = vec![json!({"type": "text", "text": text})];
    for image in &d.images {
        let mut image_url = serde_json::Map::new();
        image_url.insert("url".to_string(), Value::String(image.clone()));
        for (key, value) in &d.vision_options {
            image_url.insert(key.clone(), value.clone());
        }
        content.push(json!({"type": "image_url", "image_url": image_url}));
    }

    let mut transformed = d.messages.clone();
    let last_idx = transformed.len() - 1;
    transformed[last_idx] = Message::new(last.role.clone(), Value::Array(content));

    combine(
        &d.model,
        vec![("messages", serde_json::to_value(&transformed)?)],
        &d.options,
    )
}

fn marshal_tools(d: &ToolsData) -> Result<Vec<u8>> {
    // OpenAI wire format nests each definition under a "function" wrapper.
    let tools: Vec<Value> = d
        .tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                },
            })
        })
        .collect();

    combine(
        &d.model,
        vec![
            ("messages", serde_json::to_value(&d.messages)?),
            ("tools", Value::Array(tools)),
        ],
        &d.options,
    )
}

fn marshal_embeddings(d: &EmbeddingsData) -> Result<Vec<u8>> {
    combine(&d.model, vec![("input", d.input.clone())], &d.options)
}
