use refgraph_core::VersionPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root configuration from refgraph.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefgraphConfig {
    /// Extra namespaces whose unregistered types may be decoded
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Version gate settings
    #[serde(default)]
    pub version: VersionPolicy,

    #[serde(default)]
    pub decode: DecodeSection,

    #[serde(default)]
    pub encode: EncodeSection,
}

/// [decode] section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeSection {
    /// Restore `repr` attributes from their literal text
    #[serde(default)]
    pub allow_unsafe_repr: bool,
}

/// [encode] section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSection {
    /// Indent JSON text output
    #[serde(default)]
    pub pretty: bool,
}

/// Settings that parse but cannot be used
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("min_supported ({min_supported}) is greater than current ({current})")]
    MinSupportedAboveCurrent { current: u32, min_supported: u32 },

    #[error("Namespace names must not be empty")]
    EmptyNamespace,
}
