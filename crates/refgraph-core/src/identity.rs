//! Per-pass identity registry.
//!
//! A registry lives for exactly one top-level encode or decode call. It maps
//! issued identifiers to the values they stand for and, for heap objects,
//! maps each handle back to its identifier so a second visit can be turned
//! into a back-reference. Comparison is by handle, never by value.

use crate::object::{ObjRef, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Process-unique identifier attached to every emitted node and attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Mint a fresh identifier
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct IdentityRegistry {
    by_id: HashMap<Identifier, Value>,
    by_object: HashMap<ObjRef, Identifier>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier previously issued for this object, if any.
    ///
    /// Scalars have no identity and never match.
    pub fn lookup_by_object(&self, value: &Value) -> Option<Identifier> {
        let r = value.as_object()?;
        self.by_object.get(&r).copied()
    }

    pub fn lookup_by_identifier(&self, id: &Identifier) -> Option<&Value> {
        self.by_id.get(id)
    }

    /// Issue a fresh identifier for `value` and remember it.
    pub fn register(&mut self, value: &Value) -> Identifier {
        let id = Identifier::fresh();
        self.register_with(id, value.clone());
        id
    }

    /// Record a value under an identifier taken from a document.
    ///
    /// The first registration of an identifier wins; later ones are ignored.
    pub fn register_with(&mut self, id: Identifier, value: Value) {
        if self.by_id.contains_key(&id) {
            return;
        }
        if let Value::Object(r) = &value {
            self.by_object.entry(*r).or_insert(id);
        }
        self.by_id.insert(id, value);
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
