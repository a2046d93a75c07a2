//! Serialization modes.
//!
//! Serializes as the lowercase symbols of the persisted format:
//! `"yes"`, `"no"`, `"fallback"`, `"repr"`, `"function"` and `"iid"` for
//! back-references.

use crate::error::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Per-type policy controlling how a value is written and read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Recurse through the engine, emitting a nested node
    Yes,
    /// Store nothing; the value reads back as null
    No,
    /// Store the raw JSON-native value
    Fallback,
    /// Store a textual literal, restorable only when explicitly allowed
    Repr,
    /// Delegate to a registered serializer/deserializer pair
    Function,
    /// Point at a node already emitted in this pass
    BackRef,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Yes => "yes",
            Mode::No => "no",
            Mode::Fallback => "fallback",
            Mode::Repr => "repr",
            Mode::Function => "function",
            Mode::BackRef => "iid",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(Mode::Yes),
            "no" => Ok(Mode::No),
            "fallback" => Ok(Mode::Fallback),
            "repr" => Ok(Mode::Repr),
            "function" => Ok(Mode::Function),
            "iid" => Ok(Mode::BackRef),
            other => Err(Error::UnknownMode(other.to_string())),
        }
    }
}

impl Serialize for Mode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let symbol = String::deserialize(deserializer)?;
        symbol.parse().map_err(serde::de::Error::custom)
    }
}
