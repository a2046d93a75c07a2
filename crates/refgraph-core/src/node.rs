//! Node tree: the persisted wire format.
//!
//! A node describes one serialized object or a back-reference to one:
//!
//! ```json
//! {
//!   "module": "app", "type": "Point", "iid": "…", "mode": "yes",
//!   "attrs": {
//!     "x": { "value": 1, "mode": "fallback", "iid": "…" },
//!     "tags": { "value": [ … ], "mode": "function", "iid": "…", "class": "list" },
//!     "me": { "value": {}, "mode": "iid", "iid": "…" }
//!   },
//!   "version": 1, "min_version": 1
//! }
//! ```
//!
//! Pure back-reference nodes carry `"mode": "iid"` and `"force_use_iid": true`.
//! Only the root carries `version` / `min_version`.

use crate::error::{Error, Result};
use crate::identity::Identifier;
use crate::mode::Mode;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Version header attached once at the document root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionHeader {
    pub version: u32,
    pub min_version: u32,
}

/// One serialized object, or a back-reference to one.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Defining namespace (`module` on the wire)
    pub namespace: String,
    pub type_name: String,
    pub attrs: IndexMap<String, AttrRecord>,
    pub iid: Identifier,
    pub mode: Option<Mode>,
    /// Inline value for fallback and function nodes
    pub value: Option<serde_json::Value>,
    /// Set on nodes that only point at an earlier node (`force_use_iid`)
    pub back_reference: bool,
    pub version: Option<VersionHeader>,
}

impl Node {
    pub fn new(namespace: &str, type_name: &str, iid: Identifier, mode: Mode) -> Self {
        Self {
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
            attrs: IndexMap::new(),
            iid,
            mode: Some(mode),
            value: None,
            back_reference: false,
            version: None,
        }
    }

    pub fn back_reference(namespace: &str, type_name: &str, iid: Identifier) -> Self {
        Self {
            back_reference: true,
            ..Self::new(namespace, type_name, iid, Mode::BackRef)
        }
    }

    pub fn is_back_reference(&self) -> bool {
        self.back_reference
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("module".into(), self.namespace.clone().into());
        map.insert("type".into(), self.type_name.clone().into());
        let attrs: serde_json::Map<String, serde_json::Value> = self
            .attrs
            .iter()
            .map(|(name, record)| (name.clone(), record.to_json()))
            .collect();
        map.insert("attrs".into(), serde_json::Value::Object(attrs));
        map.insert("iid".into(), self.iid.to_string().into());
        if let Some(mode) = self.mode {
            map.insert("mode".into(), mode.as_str().into());
        }
        if let Some(value) = &self.value {
            map.insert("value".into(), value.clone());
        }
        if self.back_reference {
            map.insert("force_use_iid".into(), true.into());
        }
        if let Some(header) = self.version {
            map.insert("version".into(), header.version.into());
            map.insert("min_version".into(), header.min_version.into());
        }
        serde_json::Value::Object(map)
    }

    /// Parse a node tree, reporting unknown mode symbols as
    /// [`Error::UnknownMode`].
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let raw = RawNode::deserialize(json)?;
        Node::try_from(raw)
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawNode::deserialize(deserializer)?;
        Node::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// What an attribute record stores, by mode.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `yes`: a nested node
    Node(Box<Node>),
    /// `no`: explicit absence
    Absent,
    /// `fallback`: raw JSON
    Raw(serde_json::Value),
    /// `repr`: a textual literal
    Repr(String),
    /// `function`: a custom payload tagged with the value's runtime type
    Function {
        class: String,
        payload: serde_json::Value,
    },
    /// `iid`: a back-reference to the record's identifier
    BackRef,
}

impl AttrValue {
    pub fn mode(&self) -> Mode {
        match self {
            AttrValue::Node(_) => Mode::Yes,
            AttrValue::Absent => Mode::No,
            AttrValue::Raw(_) => Mode::Fallback,
            AttrValue::Repr(_) => Mode::Repr,
            AttrValue::Function { .. } => Mode::Function,
            AttrValue::BackRef => Mode::BackRef,
        }
    }
}

/// Serialized attribute of a node
#[derive(Debug, Clone, PartialEq)]
pub struct AttrRecord {
    pub iid: Identifier,
    pub value: AttrValue,
}

impl AttrRecord {
    pub fn new(iid: Identifier, value: AttrValue) -> Self {
        Self { iid, value }
    }

    pub fn mode(&self) -> Mode {
        self.value.mode()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let empty = || serde_json::Value::Object(serde_json::Map::new());
        let mut map = serde_json::Map::new();
        let value = match &self.value {
            AttrValue::Node(node) => node.to_json(),
            AttrValue::Absent | AttrValue::BackRef => empty(),
            AttrValue::Raw(raw) => raw.clone(),
            AttrValue::Repr(text) => text.clone().into(),
            AttrValue::Function { payload, .. } => payload.clone(),
        };
        map.insert("value".into(), value);
        map.insert("mode".into(), self.mode().as_str().into());
        map.insert("iid".into(), self.iid.to_string().into());
        if let AttrValue::Function { class, .. } = &self.value {
            map.insert("class".into(), class.clone().into());
        }
        serde_json::Value::Object(map)
    }
}

#[derive(Deserialize)]
struct RawNode {
    module: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    attrs: IndexMap<String, RawAttr>,
    iid: Identifier,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    force_use_iid: bool,
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    min_version: Option<u32>,
}

#[derive(Deserialize)]
struct RawAttr {
    #[serde(default)]
    value: serde_json::Value,
    mode: String,
    iid: Identifier,
    #[serde(default)]
    class: Option<String>,
}

impl TryFrom<RawNode> for Node {
    type Error = Error;

    fn try_from(raw: RawNode) -> Result<Self> {
        let mode = raw.mode.as_deref().map(str::parse::<Mode>).transpose()?;
        let mut attrs = IndexMap::with_capacity(raw.attrs.len());
        for (name, attr) in raw.attrs {
            attrs.insert(name, AttrRecord::try_from(attr)?);
        }
        let version = raw.version.map(|version| VersionHeader {
            version,
            min_version: raw.min_version.unwrap_or(version),
        });
        Ok(Node {
            namespace: raw.module,
            type_name: raw.type_name,
            attrs,
            iid: raw.iid,
            mode,
            value: raw.value,
            back_reference: raw.force_use_iid,
            version,
        })
    }
}

impl TryFrom<RawAttr> for AttrRecord {
    type Error = Error;

    fn try_from(raw: RawAttr) -> Result<Self> {
        let value = match raw.mode.parse::<Mode>()? {
            Mode::Yes => AttrValue::Node(Box::new(Node::from_json(&raw.value)?)),
            Mode::No => AttrValue::Absent,
            Mode::Fallback => AttrValue::Raw(raw.value),
            Mode::Repr => match raw.value {
                serde_json::Value::String(text) => AttrValue::Repr(text),
                other => return Err(Error::InvalidLiteral(other.to_string())),
            },
            Mode::Function => {
                let class = raw.class.ok_or_else(|| {
                    Error::invalid_payload("function attribute", "missing \"class\"")
                })?;
                AttrValue::Function {
                    class,
                    payload: raw.value,
                }
            }
            Mode::BackRef => AttrValue::BackRef,
        };
        Ok(AttrRecord { iid: raw.iid, value })
    }
}
