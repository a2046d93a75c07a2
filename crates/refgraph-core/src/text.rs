//! Text adapter: node trees to and from JSON text via `serde_json`.

use crate::engine::Engine;
use crate::error::Result;
use crate::node::Node;
use crate::object::{Graph, Heap, Value};
use std::io::{Read, Write};

pub fn dumps(engine: &Engine, heap: &Heap, value: &Value) -> Result<String> {
    let node = engine.encode(heap, value)?;
    Ok(serde_json::to_string(&node.to_json())?)
}

pub fn dumps_pretty(engine: &Engine, heap: &Heap, value: &Value) -> Result<String> {
    let node = engine.encode(heap, value)?;
    Ok(serde_json::to_string_pretty(&node.to_json())?)
}

/// Write compact JSON text; a failing writer surfaces as [`Error::Io`](crate::Error::Io).
pub fn dump<W: Write>(engine: &Engine, heap: &Heap, value: &Value, mut writer: W) -> Result<()> {
    let node = engine.encode(heap, value)?;
    let bytes = serde_json::to_vec(&node.to_json())?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

pub fn loads(engine: &Engine, text: &str, allow_unsafe_repr: bool) -> Result<Graph> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    engine.decode(&Node::from_json(&json)?, allow_unsafe_repr)
}

/// Read the whole source, then decode it like [`loads`].
pub fn load<R: Read>(engine: &Engine, mut reader: R, allow_unsafe_repr: bool) -> Result<Graph> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    loads(engine, &text, allow_unsafe_repr)
}
