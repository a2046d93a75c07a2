//! Engine: a frozen type registry plus a version policy.
//!
//! Every encode and decode call builds its own identity registry, so one
//! engine can serve concurrent calls from several threads.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::Result;
use crate::node::Node;
use crate::object::{Graph, Heap, Value};
use crate::registry::TypeRegistry;
use crate::version::VersionPolicy;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Engine {
    types: Arc<TypeRegistry>,
    policy: VersionPolicy,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(TypeRegistry::new())
    }
}

impl Engine {
    pub fn new(types: TypeRegistry) -> Self {
        Self::with_policy(types, VersionPolicy::default())
    }

    pub fn with_policy(types: TypeRegistry, policy: VersionPolicy) -> Self {
        Self {
            types: Arc::new(types),
            policy,
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn policy(&self) -> &VersionPolicy {
        &self.policy
    }

    /// Encode `root` into a node tree carrying the version header.
    pub fn encode(&self, heap: &Heap, root: &Value) -> Result<Node> {
        let mut encoder = Encoder::new(heap, &self.types);
        let mut node = encoder.encode(root)?;
        node.version = Some(self.policy.header());
        debug!(
            "Encoded {}.{} ({} identifiers issued)",
            node.namespace,
            node.type_name,
            encoder.identities().len()
        );
        Ok(node)
    }

    /// Rebuild a graph from a node tree.
    ///
    /// The version gate runs first. `repr` attributes are only restored when
    /// `allow_unsafe_repr` is set.
    pub fn decode(&self, node: &Node, allow_unsafe_repr: bool) -> Result<Graph> {
        self.policy.check_header(node.version)?;
        debug!("Decoding {}.{}", node.namespace, node.type_name);
        Decoder::new(&self.types, allow_unsafe_repr).decode(node)
    }
}
