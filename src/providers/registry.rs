//! Name-to-factory provider registry.
//!
//! Built-in providers are registered on first use; applications can add
//! their own backends with [`register`] before creating clients.

use super::{AzureProvider, OllamaProvider, Provider};
use crate::config::ProviderConfig;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Constructor for a provider strategy.
pub type Factory = fn(&ProviderConfig) -> Result<Arc<dyn Provider>>;

struct Registry {
    factories: RwLock<HashMap<String, Factory>>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut factories: HashMap<String, Factory> = HashMap::new();
        factories.insert("ollama".to_string(), OllamaProvider::factory);
        factories.insert("azure".to_string(), AzureProvider::factory);
        Registry {
            factories: RwLock::new(factories),
        }
    })
}

/// Registers a provider factory under a name, replacing any previous
/// registration for that name.
pub fn register(name: impl Into<String>, factory: Factory) {
    registry()
        .factories
        .write()
        .expect("provider registry poisoned")
        .insert(name.into(), factory);
}

/// Creates a provider from configuration by looking up `cfg.name`.
pub fn create(cfg: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    let factory = {
        let factories = registry()
            .factories
            .read()
            .expect("provider registry poisoned");
        factories.get(&cfg.name).copied()
    };
    match factory {
        Some(factory) => factory(cfg),
        None => Err(Error::config(format!("unknown provider: {}", cfg.name))),
    }
}

/// Lists the registered provider names, sorted.
pub fn list() -> Vec<String> {
    let mut names: Vec<String> = registry()
        .factories
        .read()
        .expect("provider registry poisoned")
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}
