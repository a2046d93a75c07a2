//! Graph decoder: node tree → live graph.
//!
//! Records are built in two phases: a placeholder cell is reserved and
//! registered under the node's identifier before any attribute is resolved,
//! so attributes that point back at the record (directly or through a
//! cycle) resolve to that same cell. The body is filled in once every
//! attribute is known.

use crate::error::{Error, Result};
use crate::identity::{Identifier, IdentityRegistry};
use crate::literal::Literal;
use crate::mode::Mode;
use crate::node::{AttrRecord, AttrValue, Node};
use crate::object::{BUILTINS, Body, Graph, Heap, ObjRef, Value};
use crate::registry::{DeserializeFn, TypeRegistry};
use indexmap::IndexMap;
use tracing::trace;

static NULL: serde_json::Value = serde_json::Value::Null;

/// Identifier and runtime type a custom payload was stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub iid: Identifier,
    pub namespace: String,
    pub type_name: String,
}

/// One decoding pass, building into a fresh heap.
pub struct Decoder<'a> {
    types: &'a TypeRegistry,
    heap: Heap,
    identities: IdentityRegistry,
    allow_unsafe_repr: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(types: &'a TypeRegistry, allow_unsafe_repr: bool) -> Self {
        Self {
            types,
            heap: Heap::new(),
            identities: IdentityRegistry::new(),
            allow_unsafe_repr,
        }
    }

    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    /// Decode a root node into a complete graph.
    ///
    /// The version header is not checked here; see [`Engine::decode`](crate::Engine::decode).
    pub fn decode(mut self, root: &Node) -> Result<Graph> {
        let root = self.decode_node(root)?;
        Ok(Graph::new(self.heap, root))
    }

    /// Claim the placeholder cell for a slot.
    ///
    /// The cell is registered under the slot's identifier right away, so
    /// back-references met while decoding the payload resolve to it.
    pub fn reserve(&mut self, slot: &Slot) -> ObjRef {
        if let Some(Value::Object(r)) = self.identities.lookup_by_identifier(&slot.iid) {
            return *r;
        }
        let r = self.heap.reserve(&slot.namespace, &slot.type_name);
        self.identities.register_with(slot.iid, Value::Object(r));
        r
    }

    /// Complete a cell obtained from [`Decoder::reserve`]
    pub fn fill(&mut self, r: ObjRef, body: Body) {
        self.heap.fill(r, body);
    }

    /// Decode a nested node given in JSON form; `null` decodes to null.
    pub fn decode_value(&mut self, json: &serde_json::Value) -> Result<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let node = Node::from_json(json)?;
        self.decode_node(&node)
    }

    pub fn decode_node(&mut self, node: &Node) -> Result<Value> {
        if node.is_back_reference() {
            return self.resolve_reference(&node.iid);
        }

        let descriptor = self.types.resolve(&node.namespace, &node.type_name)?;
        let mode = node
            .mode
            .unwrap_or_else(|| descriptor.map_or(Mode::Yes, |d| d.mode));
        trace!(
            "Decoding {}.{} as {} ({})",
            node.namespace, node.type_name, mode, node.iid
        );

        match mode {
            Mode::BackRef => self.resolve_reference(&node.iid),
            Mode::Fallback => {
                let value = match &node.value {
                    Some(raw) => self.heap.from_json(raw),
                    None => Value::Null,
                };
                self.identities.register_with(node.iid, value.clone());
                Ok(value)
            }
            Mode::Function => {
                let deserialize = self.deserializer_for(&node.namespace, &node.type_name)?;
                let slot = Slot {
                    iid: node.iid,
                    namespace: node.namespace.clone(),
                    type_name: node.type_name.clone(),
                };
                let payload = node.value.as_ref().unwrap_or(&NULL);
                let value = deserialize(self, payload, &slot)?;
                self.identities.register_with(node.iid, value.clone());
                Ok(value)
            }
            Mode::No => {
                self.identities.register_with(node.iid, Value::Null);
                Ok(Value::Null)
            }
            Mode::Yes | Mode::Repr => self.decode_record(node),
        }
    }

    fn decode_record(&mut self, node: &Node) -> Result<Value> {
        let cell = self.heap.reserve(&node.namespace, &node.type_name);
        self.identities.register_with(node.iid, Value::Object(cell));

        let mut fields = IndexMap::with_capacity(node.attrs.len());
        for (name, record) in &node.attrs {
            let value = self.decode_attribute(record)?;
            self.identities.register_with(record.iid, value.clone());
            fields.insert(name.clone(), value);
        }
        self.heap.fill(cell, Body::Record(fields));
        Ok(Value::Object(cell))
    }

    fn decode_attribute(&mut self, record: &AttrRecord) -> Result<Value> {
        match &record.value {
            AttrValue::Node(node) => self.decode_node(node),
            AttrValue::Absent => Ok(Value::Null),
            AttrValue::Raw(raw) => Ok(self.heap.from_json(raw)),
            AttrValue::Repr(text) => {
                if !self.allow_unsafe_repr {
                    return Err(Error::UnsafeReprRejected(text.clone()));
                }
                Ok(text.parse::<Literal>()?.into_value())
            }
            AttrValue::Function { class, payload } => {
                let namespace = self
                    .types
                    .get(class)
                    .and_then(|d| d.namespace.clone())
                    .unwrap_or_else(|| BUILTINS.to_string());
                let deserialize = self.deserializer_for(&namespace, class)?;
                let slot = Slot {
                    iid: record.iid,
                    namespace,
                    type_name: class.clone(),
                };
                deserialize(self, payload, &slot)
            }
            AttrValue::BackRef => self.resolve_reference(&record.iid),
        }
    }

    fn resolve_reference(&self, iid: &Identifier) -> Result<Value> {
        self.identities
            .lookup_by_identifier(iid)
            .cloned()
            .ok_or(Error::UnresolvableReference(*iid))
    }

    fn deserializer_for(&self, namespace: &str, type_name: &str) -> Result<DeserializeFn> {
        self.types
            .deserializer(type_name)
            .ok_or_else(|| Error::UnknownType {
                namespace: namespace.to_string(),
                type_name: type_name.to_string(),
            })
    }
}
