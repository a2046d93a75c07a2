//! Error types for graph encoding and decoding
//!
//! Every failure is local to the encode or decode call that raised it. A
//! failed decode never hands back a partially built graph.

use crate::identity::Identifier;
use thiserror::Error;

/// Result type alias for refgraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for refgraph operations
#[derive(Error, Debug)]
pub enum Error {
    /// A back-reference points at an identifier not seen in this pass
    #[error("No object with iid \"{0}\"")]
    UnresolvableReference(Identifier),

    /// The declared namespace or type name cannot be resolved
    #[error("Unknown type \"{type_name}\" in namespace \"{namespace}\"")]
    UnknownType { namespace: String, type_name: String },

    /// A mode symbol that the engine does not know how to apply
    #[error("Unknown serialization mode \"{0}\"")]
    UnknownMode(String),

    /// A `repr` attribute was met while literal reconstruction is disabled
    #[error("MODE_REPR is not allowed; was attempting to deserialize \"{0}\"")]
    UnsafeReprRejected(String),

    /// The document's version header fails the compatibility rule
    #[error(
        "Document version {version} (min {min_version}) is incompatible with engine version {current} (min supported {min_supported})"
    )]
    VersionIncompatible {
        version: u32,
        min_version: u32,
        current: u32,
        min_supported: u32,
    },

    /// A declared field is absent from the record being encoded
    #[error("Record of type \"{type_name}\" has no attribute \"{attribute}\"")]
    MissingAttribute { type_name: String, attribute: String },

    /// `repr` mode was requested for a value with no literal form
    #[error("Values of type \"{0}\" have no literal representation")]
    UnsupportedRepr(String),

    /// A stored literal could not be parsed
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    /// A custom payload does not have the shape its deserializer expects
    #[error("Invalid payload for \"{type_name}\": {reason}")]
    InvalidPayload { type_name: String, reason: String },

    /// A raw (fallback) value contains a cycle and cannot be flattened
    #[error("Circular reference inside a fallback value of type \"{0}\"")]
    CircularValue(String),

    /// NaN and infinities have no JSON number form
    #[error("Float {0} cannot be stored as raw JSON")]
    NonFiniteFloat(f64),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_payload(type_name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidPayload {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}
