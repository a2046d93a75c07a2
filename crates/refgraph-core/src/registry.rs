//! Type registry: the per-engine mode table.
//!
//! Maps a runtime type name to its serialization policy, optional custom
//! serializer/deserializer pair and optional fixed field layout. A registry
//! is mutable while it is being set up and is then frozen inside an
//! [`Engine`](crate::Engine), which hands it to every encode and decode call.
//!
//! A fresh registry comes preloaded with the built-in types:
//! scalars (`NoneType`, `bool`, `int`, `float`, `str`) use
//! [`Mode::Fallback`]; `list` and `dict` use [`Mode::Function`] with
//! elementwise recursive handlers (map keys pass through unchanged).
//! Unregistered types default to [`Mode::Yes`].

use crate::decoder::{Decoder, Slot};
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::mode::Mode;
use crate::object::{
    BOOL_TYPE, BUILTINS, Body, DICT_TYPE, FLOAT_TYPE, INT_TYPE, LIST_TYPE, NONE_TYPE, STR_TYPE,
    Value,
};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Custom serializer: turns a value into a JSON payload.
pub type SerializeFn =
    Arc<dyn Fn(&mut Encoder<'_>, &Value) -> Result<serde_json::Value> + Send + Sync>;

/// Custom deserializer: rebuilds a value from its JSON payload.
///
/// The [`Slot`] names the identifier the payload was stored under; a
/// deserializer whose output can be referenced from inside itself should
/// claim it with [`Decoder::reserve`] before decoding children.
pub type DeserializeFn =
    Arc<dyn Fn(&mut Decoder<'_>, &serde_json::Value, &Slot) -> Result<Value> + Send + Sync>;

/// One entry of a fixed field layout
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Overrides the mode of the field value's runtime type
    pub mode: Option<Mode>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }
}

impl From<&str> for FieldDescriptor {
    fn from(name: &str) -> Self {
        FieldDescriptor::new(name)
    }
}

/// Everything the registry knows about one type.
#[derive(Clone)]
pub struct TypeDescriptor {
    pub type_name: String,
    /// Namespace the type lives in; `None` matches any namespace
    pub namespace: Option<String>,
    pub mode: Mode,
    /// Fixed layout replacing dynamic attribute discovery
    pub fields: Option<Vec<FieldDescriptor>>,
    pub serialize: Option<SerializeFn>,
    pub deserialize: Option<DeserializeFn>,
}

impl TypeDescriptor {
    pub fn new(namespace: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            namespace: Some(namespace.into()),
            mode: Mode::Yes,
            fields: None,
            serialize: None,
            deserialize: None,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldDescriptor>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn serialize_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Encoder<'_>, &Value) -> Result<serde_json::Value> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }

    pub fn deserialize_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Decoder<'_>, &serde_json::Value, &Slot) -> Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.deserialize = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("namespace", &self.namespace)
            .field("mode", &self.mode)
            .field("fields", &self.fields)
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .finish()
    }
}

/// Mode table keyed by runtime type name
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
    namespaces: HashSet<String>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry preloaded with the built-in types
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for scalar in [NONE_TYPE, BOOL_TYPE, INT_TYPE, FLOAT_TYPE, STR_TYPE] {
            registry.declare(TypeDescriptor::new(BUILTINS, scalar).mode(Mode::Fallback));
        }
        registry.declare(
            TypeDescriptor::new(BUILTINS, LIST_TYPE)
                .mode(Mode::Function)
                .serialize_with(serialize_list)
                .deserialize_with(deserialize_list),
        );
        registry.declare(
            TypeDescriptor::new(BUILTINS, DICT_TYPE)
                .mode(Mode::Function)
                .serialize_with(serialize_dict)
                .deserialize_with(deserialize_dict),
        );
        registry
    }

    /// Registry with no types at all; only `builtins` is a known namespace
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
            namespaces: HashSet::from([BUILTINS.to_string()]),
        }
    }

    /// Set the policy for a type name.
    ///
    /// Namespace and field layout of an already declared type are kept.
    pub fn register_type(
        &mut self,
        type_name: &str,
        mode: Mode,
        serialize: Option<SerializeFn>,
        deserialize: Option<DeserializeFn>,
    ) {
        debug!("Registering type: {} ({})", type_name, mode);
        let entry = self
            .types
            .entry(type_name.to_string())
            .or_insert_with(|| TypeDescriptor {
                type_name: type_name.to_string(),
                namespace: None,
                mode,
                fields: None,
                serialize: None,
                deserialize: None,
            });
        entry.mode = mode;
        entry.serialize = serialize;
        entry.deserialize = deserialize;
    }

    /// Add or replace a full type descriptor
    pub fn declare(&mut self, descriptor: TypeDescriptor) {
        debug!(
            "Declaring type: {}.{} ({})",
            descriptor.namespace.as_deref().unwrap_or("*"),
            descriptor.type_name,
            descriptor.mode
        );
        if let Some(namespace) = &descriptor.namespace {
            self.namespaces.insert(namespace.clone());
        }
        self.types.insert(descriptor.type_name.clone(), descriptor);
    }

    /// Make a namespace resolvable for types that are not registered
    pub fn declare_namespace(&mut self, namespace: &str) {
        self.namespaces.insert(namespace.to_string());
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    pub fn mode_of(&self, type_name: &str) -> Mode {
        self.types.get(type_name).map_or(Mode::Yes, |d| d.mode)
    }

    pub fn fields_of(&self, type_name: &str) -> Option<&[FieldDescriptor]> {
        self.types.get(type_name)?.fields.as_deref()
    }

    pub fn serializer(&self, type_name: &str) -> Option<SerializeFn> {
        self.types.get(type_name)?.serialize.clone()
    }

    pub fn deserializer(&self, type_name: &str) -> Option<DeserializeFn> {
        self.types.get(type_name)?.deserialize.clone()
    }

    pub fn is_known_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    /// Check that `(namespace, type_name)` names a type this registry can build.
    pub fn resolve(&self, namespace: &str, type_name: &str) -> Result<Option<&TypeDescriptor>> {
        let resolved = match self.types.get(type_name) {
            Some(descriptor) => descriptor
                .namespace
                .as_deref()
                .is_none_or(|ns| ns == namespace),
            None => self.is_known_namespace(namespace),
        };
        if !resolved {
            return Err(Error::UnknownType {
                namespace: namespace.to_string(),
                type_name: type_name.to_string(),
            });
        }
        Ok(self.types.get(type_name))
    }
}

fn serialize_list(encoder: &mut Encoder<'_>, value: &Value) -> Result<serde_json::Value> {
    let heap = encoder.heap();
    let items = match value.as_object().and_then(|r| heap.get(r)).map(|o| &o.body) {
        Some(Body::List(items)) => items,
        _ => return Err(Error::invalid_payload(LIST_TYPE, "value is not a list")),
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(encoder.encode_value(item)?);
    }
    Ok(serde_json::Value::Array(out))
}

fn deserialize_list(
    decoder: &mut Decoder<'_>,
    payload: &serde_json::Value,
    slot: &Slot,
) -> Result<Value> {
    let items = payload
        .as_array()
        .ok_or_else(|| Error::invalid_payload(&slot.type_name, "expected a JSON array"))?;
    let cell = decoder.reserve(slot);
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        values.push(decoder.decode_value(item)?);
    }
    decoder.fill(cell, Body::List(values));
    Ok(Value::Object(cell))
}

fn serialize_dict(encoder: &mut Encoder<'_>, value: &Value) -> Result<serde_json::Value> {
    let heap = encoder.heap();
    let entries = match value.as_object().and_then(|r| heap.get(r)).map(|o| &o.body) {
        Some(Body::Map(entries)) => entries,
        _ => return Err(Error::invalid_payload(DICT_TYPE, "value is not a map")),
    };
    let mut out = serde_json::Map::with_capacity(entries.len());
    for (key, item) in entries {
        out.insert(key.clone(), encoder.encode_value(item)?);
    }
    Ok(serde_json::Value::Object(out))
}

fn deserialize_dict(
    decoder: &mut Decoder<'_>,
    payload: &serde_json::Value,
    slot: &Slot,
) -> Result<Value> {
    let entries = payload
        .as_object()
        .ok_or_else(|| Error::invalid_payload(&slot.type_name, "expected a JSON object"))?;
    let cell = decoder.reserve(slot);
    let mut values = IndexMap::with_capacity(entries.len());
    for (key, item) in entries {
        values.insert(key.clone(), decoder.decode_value(item)?);
    }
    decoder.fill(cell, Body::Map(values));
    Ok(Value::Object(cell))
}
