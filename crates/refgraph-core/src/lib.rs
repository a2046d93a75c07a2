//! Reference-preserving object graph serialization.
//!
//! Converts a graph held in a [`Heap`] (shared references and cycles
//! included) into a JSON-native [`Node`] tree, and rebuilds an equivalent
//! graph from such a tree later. Identity is tracked per pass by an
//! [`IdentityRegistry`]; per-type policy comes from a [`TypeRegistry`];
//! decoded documents go through a [`VersionPolicy`] gate first.

pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod identity;
pub mod literal;
pub mod mode;
pub mod node;
pub mod object;
pub mod registry;
pub mod text;
pub mod version;

pub use decoder::{Decoder, Slot};
pub use encoder::Encoder;
pub use engine::Engine;
pub use error::{Error, Result};
pub use identity::{Identifier, IdentityRegistry};
pub use literal::Literal;
pub use mode::Mode;
pub use node::{AttrRecord, AttrValue, Node, VersionHeader};
pub use object::{Body, Graph, Heap, ObjRef, Object, Value};
pub use registry::{DeserializeFn, FieldDescriptor, SerializeFn, TypeDescriptor, TypeRegistry};
pub use text::{dump, dumps, dumps_pretty, load, loads};
pub use version::{Compatibility, Severity, VersionPolicy};
