//! Typed configuration consumed by the execution client.
//!
//! Configuration is plain data: the client, provider, and model sections are
//! independent structs with serde support and sensible defaults, so they can
//! be loaded from JSON or built in code. Durations accept either a human
//! string (`"30s"`, `"2m"`) or a bare number of seconds.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Free-form option map merged into provider wire requests.
pub type OptionMap = serde_json::Map<String, serde_json::Value>;

/// Configuration for the HTTP execution layer: timeout, retry behavior, and
/// connection pooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Total per-attempt request timeout.
    #[serde(with = "duration")]
    pub timeout: Duration,
    /// Retry behavior for transient failures.
    pub retry: RetryConfig,
    /// Maximum idle connections kept per host.
    pub connection_pool_size: usize,
    /// Timeout for establishing new connections.
    #[serde(with = "duration")]
    pub connection_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            retry: RetryConfig::default(),
            connection_pool_size: 10,
            connection_timeout: Duration::from_secs(30),
        }
    }
}

/// Retry behavior for failed requests: exponential backoff with optional
/// jitter, applied only to failures classified as transient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each attempt.
    #[serde(with = "duration")]
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff delay.
    #[serde(with = "duration")]
    pub max_backoff: Duration,
    /// Randomize each delay by up to ±25% to avoid thundering herds.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            jitter: true,
        }
    }
}

/// Configuration for an LLM provider: its name, base URL, and provider
/// specific options (deployment, API version, authentication, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Registered provider name (e.g. "ollama", "azure").
    pub name: String,
    /// Base endpoint URL.
    pub base_url: String,
    /// Provider-specific options.
    pub options: OptionMap,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            options: OptionMap::new(),
        }
    }
}

/// Configuration for a model: its identifier plus per-protocol default
/// options.
///
/// Example JSON:
///
/// ```json
/// {
///   "name": "gpt-4o",
///   "capabilities": {
///     "chat": { "temperature": 0.7, "max_tokens": 4096 },
///     "vision": { "temperature": 0.5 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier (e.g. "gpt-4o", "llama3.1:8b").
    pub name: String,
    /// Protocol name to default option map.
    pub capabilities: HashMap<String, OptionMap>,
}

/// Top-level configuration bundling the client, provider, and model
/// sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP execution settings.
    pub client: ClientConfig,
    /// Provider selection and options.
    pub provider: ProviderConfig,
    /// Model identifier and per-protocol defaults.
    pub model: ModelConfig,
}

impl RelayConfig {
    /// Loads configuration from a JSON file, filling unset fields with
    /// defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("failed to read config file: {e}")))?;
        serde_json::from_str(&data)
            .map_err(|e| Error::config(format!("failed to parse config file: {e}")))
    }
}

/// Serde support for durations expressed as `"500ms"`, `"90s"`, `"2m"`,
/// `"1h"`, or a bare number of seconds.
pub mod duration {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Seconds(u64),
    }

    /// Serializes a duration in the most compact suffix form.
    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*d))
    }

    /// Deserializes a duration from a suffixed string or seconds number.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => parse_duration(&s).map_err(D::Error::custom),
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        }
    }

    pub(crate) fn format_duration(d: Duration) -> String {
        let ms = d.as_millis();
        if ms % 1_000 != 0 {
            return format!("{ms}ms");
        }
        let secs = d.as_secs();
        if secs % 60 != 0 {
            format!("{secs}s")
        } else if secs % 3_600 != 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}h", secs / 3_600)
        }
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("invalid duration {s:?}: missing unit (ms, s, m, h)"))?;
        let (value, unit) = s.split_at(split);
        let value: u64 = value
            .parse()
            .map_err(|_| format!("invalid duration {s:?}: bad numeric value"))?;
        match unit {
            "ms" => Ok(Duration::from_millis(value)),
            "s" => Ok(Duration::from_secs(value)),
            "m" => Ok(Duration::from_secs(value * 60)),
            "h" => Ok(Duration::from_secs(value * 3_600)),
            _ => Err(format!("invalid duration {s:?}: unknown unit {unit:?}")),
        }
    }
}
