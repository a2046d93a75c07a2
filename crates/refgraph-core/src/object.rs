//! Arena-backed object model.
//!
//! Live graphs are held in a [`Heap`]: every shared or possibly cyclic value
//! (records, lists, maps) lives in a cell addressed by an [`ObjRef`] handle.
//! Reference identity is handle equality, so two value-equal objects stored
//! in different cells stay distinct. Scalars are carried by value and have
//! no identity.
//!
//! Cells support two-phase construction: [`Heap::reserve`] hands out a
//! placeholder handle that other values may point at before
//! [`Heap::fill`] supplies the body.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::ops::Index;

/// Namespace of the built-in runtime types.
pub const BUILTINS: &str = "builtins";

pub const NONE_TYPE: &str = "NoneType";
pub const BOOL_TYPE: &str = "bool";
pub const INT_TYPE: &str = "int";
pub const FLOAT_TYPE: &str = "float";
pub const STR_TYPE: &str = "str";
pub const LIST_TYPE: &str = "list";
pub const DICT_TYPE: &str = "dict";

/// Handle to a cell in a [`Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(usize);

impl ObjRef {
    /// Position of the cell inside its heap
    pub fn index(self) -> usize {
        self.0
    }
}

/// A value in the live graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(ObjRef),
}

impl Value {
    pub fn as_object(&self) -> Option<ObjRef> {
        match self {
            Value::Object(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<ObjRef> for Value {
    fn from(r: ObjRef) -> Self {
        Value::Object(r)
    }
}

/// Contents of a heap cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Allocated but not yet filled
    Pending,
    /// Named attributes, in insertion order
    Record(IndexMap<String, Value>),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

/// A heap cell: a runtime type plus its body.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub namespace: String,
    pub type_name: String,
    pub body: Body,
}

impl Object {
    /// Attribute names of a record, in order. `None` for non-records.
    pub fn attribute_names(&self) -> Option<Vec<String>> {
        match &self.body {
            Body::Record(fields) => Some(fields.keys().cloned().collect()),
            _ => None,
        }
    }
}

/// Arena holding every object of one graph.
#[derive(Debug, Clone, Default)]
pub struct Heap {
    objects: Vec<Object>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn push(&mut self, namespace: &str, type_name: &str, body: Body) -> ObjRef {
        self.objects.push(Object {
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
            body,
        });
        ObjRef(self.objects.len() - 1)
    }

    /// Allocate a record of a user type.
    pub fn record<K, I>(&mut self, namespace: &str, type_name: &str, fields: I) -> ObjRef
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.push(namespace, type_name, Body::Record(fields))
    }

    /// Allocate a built-in list.
    pub fn list<I>(&mut self, items: I) -> ObjRef
    where
        I: IntoIterator<Item = Value>,
    {
        self.push(BUILTINS, LIST_TYPE, Body::List(items.into_iter().collect()))
    }

    /// Allocate a built-in string-keyed map.
    pub fn map<K, I>(&mut self, entries: I) -> ObjRef
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.push(BUILTINS, DICT_TYPE, Body::Map(entries))
    }

    /// Allocate a placeholder cell whose body is supplied later by [`Heap::fill`].
    pub fn reserve(&mut self, namespace: &str, type_name: &str) -> ObjRef {
        self.push(namespace, type_name, Body::Pending)
    }

    /// Complete a cell allocated with [`Heap::reserve`].
    pub fn fill(&mut self, r: ObjRef, body: Body) {
        if let Some(object) = self.objects.get_mut(r.0) {
            object.body = body;
        }
    }

    pub fn get(&self, r: ObjRef) -> Option<&Object> {
        self.objects.get(r.0)
    }

    pub fn get_mut(&mut self, r: ObjRef) -> Option<&mut Object> {
        self.objects.get_mut(r.0)
    }

    /// Set an attribute on a record, returning the previous value.
    ///
    /// A pending cell becomes an empty record first. Lists and maps are left
    /// unchanged.
    pub fn set_attr(&mut self, r: ObjRef, name: &str, value: Value) -> Option<Value> {
        let object = self.objects.get_mut(r.0)?;
        if matches!(object.body, Body::Pending) {
            object.body = Body::Record(IndexMap::new());
        }
        match &mut object.body {
            Body::Record(fields) => fields.insert(name.to_string(), value),
            _ => None,
        }
    }

    pub fn attr(&self, r: ObjRef, name: &str) -> Option<&Value> {
        match &self.get(r)?.body {
            Body::Record(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Append to a list cell.
    pub fn push_item(&mut self, r: ObjRef, value: Value) {
        if let Some(Object {
            body: Body::List(items),
            ..
        }) = self.objects.get_mut(r.0)
        {
            items.push(value);
        }
    }

    /// Runtime `(namespace, type_name)` of a value.
    pub fn type_of<'a>(&'a self, value: &'a Value) -> (&'a str, &'a str) {
        match value {
            Value::Null => (BUILTINS, NONE_TYPE),
            Value::Bool(_) => (BUILTINS, BOOL_TYPE),
            Value::Int(_) => (BUILTINS, INT_TYPE),
            Value::Float(_) => (BUILTINS, FLOAT_TYPE),
            Value::Str(_) => (BUILTINS, STR_TYPE),
            Value::Object(r) => match self.get(*r) {
                Some(object) => (object.namespace.as_str(), object.type_name.as_str()),
                None => (BUILTINS, NONE_TYPE),
            },
        }
    }

    /// Flatten a value into plain JSON, dropping identity.
    ///
    /// Records become JSON objects of their attributes. Fails with
    /// [`Error::CircularValue`] when the value reaches itself and with
    /// [`Error::NonFiniteFloat`] on NaN or an infinity.
    pub fn to_json(&self, value: &Value) -> Result<serde_json::Value> {
        let mut active = HashSet::new();
        self.to_json_inner(value, &mut active)
    }

    fn to_json_inner(
        &self,
        value: &Value,
        active: &mut HashSet<ObjRef>,
    ) -> Result<serde_json::Value> {
        let r = match value {
            Value::Null => return Ok(serde_json::Value::Null),
            Value::Bool(b) => return Ok(serde_json::Value::Bool(*b)),
            Value::Int(n) => return Ok(serde_json::Value::from(*n)),
            Value::Float(n) => {
                return serde_json::Number::from_f64(*n)
                    .map(serde_json::Value::Number)
                    .ok_or(Error::NonFiniteFloat(*n));
            }
            Value::Str(s) => return Ok(serde_json::Value::String(s.clone())),
            Value::Object(r) => *r,
        };
        let Some(object) = self.get(r) else {
            return Ok(serde_json::Value::Null);
        };
        if !active.insert(r) {
            return Err(Error::CircularValue(object.type_name.clone()));
        }
        let json = match &object.body {
            Body::Pending => serde_json::Value::Null,
            Body::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| self.to_json_inner(item, active))
                    .collect::<Result<_>>()?,
            ),
            Body::Record(entries) | Body::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (key, item) in entries {
                    map.insert(key.clone(), self.to_json_inner(item, active)?);
                }
                serde_json::Value::Object(map)
            }
        };
        active.remove(&r);
        Ok(json)
    }

    /// Build a value from plain JSON; arrays and objects become fresh
    /// lists and maps.
    pub fn from_json(&mut self, json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                let items: Vec<Value> = items.iter().map(|item| self.from_json(item)).collect();
                Value::Object(self.list(items))
            }
            serde_json::Value::Object(map) => {
                let entries: Vec<(String, Value)> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), self.from_json(v)))
                    .collect();
                Value::Object(self.map(entries))
            }
        }
    }

    /// Structural equality of two graphs that also requires the same
    /// sharing and cycle shape.
    ///
    /// Handles are matched one-to-one: if `a` reaches one object along two
    /// paths, `b` must reach a single object along the same two paths.
    pub fn isomorphic(a_heap: &Heap, a: &Value, b_heap: &Heap, b: &Value) -> bool {
        Isomorphism {
            a_heap,
            b_heap,
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
        .check(a, b)
    }
}

impl Index<ObjRef> for Heap {
    type Output = Object;

    fn index(&self, r: ObjRef) -> &Object {
        &self.objects[r.0]
    }
}

struct Isomorphism<'a> {
    a_heap: &'a Heap,
    b_heap: &'a Heap,
    forward: HashMap<ObjRef, ObjRef>,
    backward: HashMap<ObjRef, ObjRef>,
}

impl Isomorphism<'_> {
    fn check(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Object(x), Value::Object(y)) => self.check_objects(*x, *y),
            (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
            _ => a == b,
        }
    }

    fn check_objects(&mut self, x: ObjRef, y: ObjRef) -> bool {
        match (self.forward.get(&x), self.backward.get(&y)) {
            (Some(mapped_y), Some(mapped_x)) => return *mapped_y == y && *mapped_x == x,
            (None, None) => {}
            _ => return false,
        }
        self.forward.insert(x, y);
        self.backward.insert(y, x);

        let (a_heap, b_heap) = (self.a_heap, self.b_heap);
        let (Some(ox), Some(oy)) = (a_heap.get(x), b_heap.get(y)) else {
            return false;
        };
        if ox.namespace != oy.namespace || ox.type_name != oy.type_name {
            return false;
        }
        match (&ox.body, &oy.body) {
            (Body::Pending, Body::Pending) => true,
            (Body::List(xs), Body::List(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(p, q)| self.check(p, q))
            }
            (Body::Record(xs), Body::Record(ys)) | (Body::Map(xs), Body::Map(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .all(|(k, p)| ys.get(k).is_some_and(|q| self.check(p, q)))
            }
            _ => false,
        }
    }
}

/// A decoded graph: the heap that owns its objects plus the root value.
#[derive(Debug, Clone)]
pub struct Graph {
    pub heap: Heap,
    pub root: Value,
}

impl Graph {
    pub fn new(heap: Heap, root: Value) -> Self {
        Self { heap, root }
    }

    /// Root object handle, if the root is not a scalar
    pub fn root_object(&self) -> Option<ObjRef> {
        self.root.as_object()
    }

    /// Attribute of the root record
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.heap.attr(self.root_object()?, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equal_objects_stay_distinct() {
        let mut heap = Heap::new();
        let a = heap.record("app", "Point", [("x", Value::Int(1))]);
        let b = heap.record("app", "Point", [("x", Value::Int(1))]);
        assert_ne!(a, b);
        assert_eq!(heap[a], heap[b]);
    }

    #[test]
    fn test_reserve_then_fill() {
        let mut heap = Heap::new();
        let r = heap.reserve("app", "Node");
        assert_eq!(heap[r].body, Body::Pending);
        heap.fill(r, Body::List(vec![Value::Object(r)]));
        assert_eq!(heap[r].body, Body::List(vec![Value::Object(r)]));
    }

    #[test]
    fn test_type_of_builtins() {
        let mut heap = Heap::new();
        let list = Value::Object(heap.list(Vec::<Value>::new()));
        assert_eq!(heap.type_of(&Value::Null), (BUILTINS, NONE_TYPE));
        assert_eq!(heap.type_of(&Value::Float(1.5)), (BUILTINS, FLOAT_TYPE));
        assert_eq!(heap.type_of(&list), (BUILTINS, LIST_TYPE));
    }

    #[test]
    fn test_to_json_rejects_cycles() {
        let mut heap = Heap::new();
        let list = heap.list([Value::Int(1)]);
        heap.push_item(list, Value::Object(list));
        let err = heap.to_json(&Value::Object(list)).unwrap_err();
        assert!(matches!(err, Error::CircularValue(_)));
    }

    #[test]
    fn test_to_json_allows_shared_acyclic_values() {
        let mut heap = Heap::new();
        let inner = Value::Object(heap.list([Value::Int(1)]));
        let outer = heap.list([inner.clone(), inner]);
        let json = heap.to_json(&Value::Object(outer)).unwrap();
        assert_eq!(json, serde_json::json!([[1], [1]]));
    }

    #[test]
    fn test_to_json_rejects_non_finite_floats() {
        let mut heap = Heap::new();
        for n in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = heap.to_json(&Value::Float(n)).unwrap_err();
            assert!(matches!(err, Error::NonFiniteFloat(_)));
        }
        let nested = heap.list([Value::Float(1.5), Value::Float(f64::INFINITY)]);
        assert!(matches!(
            heap.to_json(&Value::Object(nested)),
            Err(Error::NonFiniteFloat(n)) if n == f64::INFINITY
        ));
    }

    #[test]
    fn test_map_keeps_insertion_order_through_json() {
        let mut heap = Heap::new();
        let map = heap.map([("z", Value::Int(1)), ("a", Value::Int(2)), ("m", Value::Int(3))]);
        let json = heap.to_json(&Value::Object(map)).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);

        let back = heap.from_json(&json).as_object().unwrap();
        let names: Vec<&str> = match &heap[back].body {
            Body::Map(entries) => entries.keys().map(String::as_str).collect(),
            other => panic!("expected a map, got {:?}", other),
        };
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_isomorphic_distinguishes_sharing() {
        let mut a = Heap::new();
        let shared = Value::Object(a.record("app", "Leaf", [("v", Value::Int(1))]));
        let a_root = Value::Object(a.list([shared.clone(), shared]));

        let mut b = Heap::new();
        let l1 = Value::Object(b.record("app", "Leaf", [("v", Value::Int(1))]));
        let l2 = Value::Object(b.record("app", "Leaf", [("v", Value::Int(1))]));
        let b_root = Value::Object(b.list([l1, l2]));

        assert!(Heap::isomorphic(&a, &a_root, &a, &a_root));
        assert!(!Heap::isomorphic(&a, &a_root, &b, &b_root));
    }

    #[test]
    fn test_isomorphic_cycles() {
        let mut a = Heap::new();
        let x = a.record("app", "Loop", Vec::<(String, Value)>::new());
        a.set_attr(x, "me", Value::Object(x));

        let mut b = Heap::new();
        let y = b.record("app", "Loop", Vec::<(String, Value)>::new());
        b.set_attr(y, "me", Value::Object(y));

        assert!(Heap::isomorphic(&a, &Value::Object(x), &b, &Value::Object(y)));
    }
}
