//! Graph encoder: live graph → node tree.
//!
//! Every object is assigned an identifier on its first visit; any later
//! visit in the same pass emits a back-reference instead of content. That is
//! the only cycle-breaking mechanism.

use crate::error::{Error, Result};
use crate::identity::{Identifier, IdentityRegistry};
use crate::literal::Literal;
use crate::mode::Mode;
use crate::node::{AttrRecord, AttrValue, Node};
use crate::object::{Heap, Value};
use crate::registry::{FieldDescriptor, SerializeFn, TypeRegistry};
use tracing::trace;

/// Outcome of encoding one object
enum Encoded {
    Node(Node),
    /// No attributes and no mode able to store the value
    Unserializable(Identifier),
}

/// One encoding pass over a heap.
///
/// Custom serializers receive the encoder so they can encode nested values
/// with [`Encoder::encode_value`] inside the same identity space.
pub struct Encoder<'a> {
    heap: &'a Heap,
    types: &'a TypeRegistry,
    identities: IdentityRegistry,
}

impl<'a> Encoder<'a> {
    pub fn new(heap: &'a Heap, types: &'a TypeRegistry) -> Self {
        Self {
            heap,
            types,
            identities: IdentityRegistry::new(),
        }
    }

    pub fn heap(&self) -> &'a Heap {
        self.heap
    }

    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    /// Encode a root value.
    ///
    /// A root that cannot be serialized yields a `no` node, which decodes
    /// to null.
    pub fn encode(&mut self, root: &Value) -> Result<Node> {
        match self.encode_node(root)? {
            Encoded::Node(node) => Ok(node),
            Encoded::Unserializable(iid) => {
                let (namespace, type_name) = self.heap.type_of(root);
                Ok(Node::new(namespace, type_name, iid, Mode::No))
            }
        }
    }

    /// Encode a nested value to its JSON node form.
    ///
    /// Values that cannot be serialized are written as JSON `null`.
    pub fn encode_value(&mut self, value: &Value) -> Result<serde_json::Value> {
        match self.encode_node(value)? {
            Encoded::Node(node) => Ok(node.to_json()),
            Encoded::Unserializable(_) => Ok(serde_json::Value::Null),
        }
    }

    fn encode_node(&mut self, value: &Value) -> Result<Encoded> {
        let heap = self.heap;
        let (namespace, type_name) = heap.type_of(value);

        if let Some(iid) = self.identities.lookup_by_object(value) {
            trace!("Back-reference to {}.{} ({})", namespace, type_name, iid);
            return Ok(Encoded::Node(Node::back_reference(namespace, type_name, iid)));
        }
        let iid = self.identities.register(value);
        let mode = self.types.mode_of(type_name);
        trace!("Encoding {}.{} as {} ({})", namespace, type_name, mode, iid);

        if mode == Mode::Function {
            let serialize = self.serializer_for(type_name)?;
            let payload = serialize(self, value)?;
            let mut node = Node::new(namespace, type_name, iid, Mode::Function);
            node.value = Some(payload);
            return Ok(Encoded::Node(node));
        }

        match self.attribute_layout(value, type_name) {
            Some(fields) => {
                let mut node = Node::new(namespace, type_name, iid, Mode::Yes);
                for field in &fields {
                    let record = self.encode_attribute(value, type_name, field)?;
                    node.attrs.insert(field.name.clone(), record);
                }
                Ok(Encoded::Node(node))
            }
            None if mode == Mode::Fallback => {
                let mut node = Node::new(namespace, type_name, iid, Mode::Fallback);
                node.value = Some(heap.to_json(value)?);
                Ok(Encoded::Node(node))
            }
            None => Ok(Encoded::Unserializable(iid)),
        }
    }

    /// Declared field layout if the type has one, else the record's own
    /// attribute names.
    fn attribute_layout(&self, value: &Value, type_name: &str) -> Option<Vec<FieldDescriptor>> {
        if let Some(fields) = self.types.fields_of(type_name) {
            return Some(fields.to_vec());
        }
        let names = self.heap.get(value.as_object()?)?.attribute_names()?;
        Some(names.into_iter().map(FieldDescriptor::new).collect())
    }

    fn encode_attribute(
        &mut self,
        owner: &Value,
        owner_type: &str,
        field: &FieldDescriptor,
    ) -> Result<AttrRecord> {
        let heap = self.heap;
        let attr = owner
            .as_object()
            .and_then(|r| heap.attr(r, &field.name))
            .ok_or_else(|| Error::MissingAttribute {
                type_name: owner_type.to_string(),
                attribute: field.name.clone(),
            })?;

        if let Some(iid) = self.identities.lookup_by_object(attr) {
            return Ok(AttrRecord::new(iid, AttrValue::BackRef));
        }

        let (_, attr_type) = heap.type_of(attr);
        let mode = field
            .mode
            .unwrap_or_else(|| self.types.mode_of(attr_type));

        let record = match mode {
            Mode::Yes => match self.encode_node(attr)? {
                Encoded::Node(node) => AttrRecord::new(node.iid, AttrValue::Node(Box::new(node))),
                Encoded::Unserializable(iid) => AttrRecord::new(iid, AttrValue::Absent),
            },
            Mode::No => AttrRecord::new(self.identities.register(attr), AttrValue::Absent),
            Mode::Fallback => {
                let iid = self.identities.register(attr);
                AttrRecord::new(iid, AttrValue::Raw(heap.to_json(attr)?))
            }
            Mode::Repr => {
                let literal = Literal::from_value(attr)
                    .ok_or_else(|| Error::UnsupportedRepr(attr_type.to_string()))?;
                let iid = self.identities.register(attr);
                AttrRecord::new(iid, AttrValue::Repr(literal.to_string()))
            }
            Mode::Function => {
                let serialize = self.serializer_for(attr_type)?;
                let iid = self.identities.register(attr);
                let payload = serialize(self, attr)?;
                AttrRecord::new(
                    iid,
                    AttrValue::Function {
                        class: attr_type.to_string(),
                        payload,
                    },
                )
            }
            Mode::BackRef => return Err(Error::UnknownMode(mode.to_string())),
        };
        Ok(record)
    }

    fn serializer_for(&self, type_name: &str) -> Result<SerializeFn> {
        self.types
            .serializer(type_name)
            .ok_or_else(|| Error::invalid_payload(type_name, "no serializer registered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{BUILTINS, LIST_TYPE};
    use serde_json::json;

    #[test]
    fn test_plain_record_uses_yes() {
        let mut heap = Heap::new();
        let point = heap.record("app", "Point", [("x", Value::Int(1)), ("y", Value::Int(2))]);
        let types = TypeRegistry::new();

        let node = Encoder::new(&heap, &types)
            .encode(&Value::Object(point))
            .unwrap();
        assert_eq!(node.mode, Some(Mode::Yes));
        assert_eq!(node.namespace, "app");
        assert_eq!(node.attrs["x"].value, AttrValue::Raw(json!(1)));
        assert_eq!(node.attrs["y"].value, AttrValue::Raw(json!(2)));
    }

    #[test]
    fn test_self_reference_becomes_back_reference() {
        let mut heap = Heap::new();
        let me = heap.record("app", "Loop", Vec::<(String, Value)>::new());
        heap.set_attr(me, "me", Value::Object(me));
        let types = TypeRegistry::new();

        let node = Encoder::new(&heap, &types)
            .encode(&Value::Object(me))
            .unwrap();
        let record = &node.attrs["me"];
        assert_eq!(record.value, AttrValue::BackRef);
        assert_eq!(record.iid, node.iid);
    }

    #[test]
    fn test_list_root_uses_function_payload() {
        let mut heap = Heap::new();
        let list = heap.list([Value::Int(1), Value::Str("a".into())]);
        let types = TypeRegistry::new();

        let node = Encoder::new(&heap, &types)
            .encode(&Value::Object(list))
            .unwrap();
        assert_eq!(node.namespace, BUILTINS);
        assert_eq!(node.type_name, LIST_TYPE);
        assert_eq!(node.mode, Some(Mode::Function));
        let payload = node.value.unwrap();
        assert_eq!(payload[0]["type"], "int");
        assert_eq!(payload[0]["value"], 1);
        assert_eq!(payload[1]["value"], "a");
    }

    #[test]
    fn test_unserializable_attribute_is_downgraded_to_no() {
        let mut heap = Heap::new();
        let owner = heap.record("app", "Owner", [("n", Value::Int(5))]);
        let mut types = TypeRegistry::new();
        // An int forced through `yes` has no attributes to emit
        types.register_type("int", Mode::Yes, None, None);

        let node = Encoder::new(&heap, &types)
            .encode(&Value::Object(owner))
            .unwrap();
        assert_eq!(node.attrs["n"].value, AttrValue::Absent);
    }

    #[test]
    fn test_backref_registered_as_type_mode_is_unknown() {
        let mut heap = Heap::new();
        let inner = Value::Object(heap.record("app", "Inner", Vec::<(String, Value)>::new()));
        let owner = heap.record("app", "Owner", [("inner", inner)]);
        let mut types = TypeRegistry::new();
        types.register_type("Inner", Mode::BackRef, None, None);

        let err = Encoder::new(&heap, &types)
            .encode(&Value::Object(owner))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMode(m) if m == "iid"));
    }

    #[test]
    fn test_repr_of_object_is_unsupported() {
        let mut heap = Heap::new();
        let list = Value::Object(heap.list(Vec::<Value>::new()));
        let owner = heap.record("app", "Owner", [("items", list)]);
        let mut types = TypeRegistry::new();
        types.register_type("list", Mode::Repr, None, None);

        let err = Encoder::new(&heap, &types)
            .encode(&Value::Object(owner))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedRepr(t) if t == "list"));
    }
}
