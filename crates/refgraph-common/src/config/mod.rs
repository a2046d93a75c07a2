//! Configuration module
//!
//! Loads refgraph settings (refgraph.toml, or refgraph.json) and turns them
//! into a ready [`Engine`].

pub mod model;

use refgraph_core::{Engine, Graph, Heap, TypeRegistry, Value};
use std::path::Path;
use tracing::debug;

pub use self::model::*;

impl RefgraphConfig {
    /// Load configuration from a file path
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: RefgraphConfig = match path.extension() {
            Some(ext) if ext == "json" => serde_json::from_str(&content)?,
            // Default to TOML
            _ => toml::from_str(&content)?,
        };
        config.validate()?;
        debug!("Loaded refgraph config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: RefgraphConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.min_supported > self.version.current {
            return Err(ConfigError::MinSupportedAboveCurrent {
                current: self.version.current,
                min_supported: self.version.min_supported,
            });
        }
        if self.namespaces.iter().any(|ns| ns.trim().is_empty()) {
            return Err(ConfigError::EmptyNamespace);
        }
        Ok(())
    }

    /// Freeze `types` into an engine using these settings.
    ///
    /// Configured namespaces are declared on the registry first.
    pub fn build_engine(&self, mut types: TypeRegistry) -> Engine {
        for namespace in &self.namespaces {
            types.declare_namespace(namespace);
        }
        Engine::with_policy(types, self.version)
    }

    /// Encode to JSON text, indented when `encode.pretty` is set
    pub fn dumps(&self, engine: &Engine, heap: &Heap, value: &Value) -> crate::Result<String> {
        let text = if self.encode.pretty {
            refgraph_core::dumps_pretty(engine, heap, value)?
        } else {
            refgraph_core::dumps(engine, heap, value)?
        };
        Ok(text)
    }

    /// Decode JSON text with `decode.allow_unsafe_repr`
    pub fn loads(&self, engine: &Engine, text: &str) -> crate::Result<Graph> {
        Ok(refgraph_core::loads(
            engine,
            text,
            self.decode.allow_unsafe_repr,
        )?)
    }
}
