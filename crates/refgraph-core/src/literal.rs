//! Typed literals for `repr` mode.
//!
//! A literal is written in Python literal syntax so documents produced by
//! older writers stay readable:
//! - `None`, `True`, `False`
//! - `42`, `-7`
//! - `3.14`, `1e+100`, `inf`, `nan`
//! - `'text'` or `"text"` with backslash escapes
//!
//! Parsing is a small hand-written scanner; nothing is evaluated.

use crate::error::{Error, Result};
use crate::object::Value;
use std::fmt;
use std::str::FromStr;

/// Literal constant values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Literal form of a scalar value. Heap objects have none.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Literal::None),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Int(n) => Some(Literal::Integer(*n)),
            Value::Float(n) => Some(Literal::Float(*n)),
            Value::Str(s) => Some(Literal::String(s.clone())),
            Value::Object(_) => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Literal::None => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Integer(n) => Value::Int(n),
            Literal::Float(n) => Value::Float(n),
            Literal::String(s) => Value::Str(s),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(n) if n.is_nan() => f.write_str("nan"),
            Literal::Float(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "inf" } else { "-inf" })
            }
            // Debug keeps a trailing ".0" so the literal reads back as a float
            Literal::Float(n) => write!(f, "{:?}", n),
            Literal::String(s) => write_quoted(f, s),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{}", quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{}", c)?,
            c if (c as u32) < 0x20 || c as u32 == 0x7f => write!(f, "\\x{:02x}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "{}", quote)
}

impl FromStr for Literal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        match text {
            "None" => return Ok(Literal::None),
            "True" => return Ok(Literal::Bool(true)),
            "False" => return Ok(Literal::Bool(false)),
            _ => {}
        }
        if text.starts_with('\'') || text.starts_with('"') {
            return parse_quoted(text).map(Literal::String);
        }
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Literal::Integer(n));
        }
        if looks_numeric(text) {
            if let Ok(n) = text.parse::<f64>() {
                return Ok(Literal::Float(n));
            }
        }
        Err(Error::InvalidLiteral(s.to_string()))
    }
}

fn looks_numeric(text: &str) -> bool {
    let unsigned = text.trim_start_matches(['-', '+']);
    matches!(unsigned, "inf" | "nan")
        || (!unsigned.is_empty()
            && unsigned
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+')))
}

fn parse_quoted(text: &str) -> Result<String> {
    let invalid = || Error::InvalidLiteral(text.to_string());
    let mut chars = text.chars();
    let quote = chars.next().ok_or_else(invalid)?;
    let mut out = String::new();
    loop {
        let c = chars.next().ok_or_else(invalid)?;
        if c == quote {
            break;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next().ok_or_else(invalid)? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            'x' => out.push(read_code_point(&mut chars, 2).ok_or_else(invalid)?),
            'u' => out.push(read_code_point(&mut chars, 4).ok_or_else(invalid)?),
            'U' => out.push(read_code_point(&mut chars, 8).ok_or_else(invalid)?),
            other @ ('\\' | '\'' | '"') => out.push(other),
            _ => return Err(invalid()),
        }
    }
    // Nothing may follow the closing quote
    if chars.next().is_some() {
        return Err(invalid());
    }
    Ok(out)
}

fn read_code_point(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
}
