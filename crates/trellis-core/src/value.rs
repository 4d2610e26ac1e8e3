//! Public graph terms.
//!
//! A `Value` is what a caller sees: an IRI, a blank node or a literal. Refs are
//! resolved to Values through the store's naming operation only when needed.

use serde::{Deserialize, Serialize};
use std::fmt;

const XSD_INTEGER: &str = "http://schema.org/Integer";
const XSD_BOOLEAN: &str = "http://schema.org/Boolean";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Iri(String),
    BlankNode(String),
    /// Plain string literal.
    String(String),
    LangString {
        value: String,
        lang: String,
    },
    TypedString {
        value: String,
        datatype: String,
    },
    Int(i64),
    Bool(bool),
    /// Untyped token printed verbatim. Mostly used by tests and simple stores.
    Raw(String),
}

impl Value {
    pub fn iri(s: impl Into<String>) -> Self {
        Value::Iri(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn raw(s: impl Into<String>) -> Self {
        Value::Raw(s.into())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Lexical form without quoting or datatype decoration.
    pub fn lexical(&self) -> String {
        match self {
            Value::Iri(s)
            | Value::BlankNode(s)
            | Value::String(s)
            | Value::Raw(s)
            | Value::LangString { value: s, .. }
            | Value::TypedString { value: s, .. } => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
        }
    }

    /// True for terms whose lexical form is compared as text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Value::String(_)
                | Value::Raw(_)
                | Value::LangString { .. }
                | Value::TypedString { .. }
                | Value::Iri(_)
                | Value::BlankNode(_)
        )
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Iri(s) => write!(f, "<{s}>"),
            Value::BlankNode(s) => write!(f, "_:{s}"),
            Value::String(s) => write_quoted(f, s),
            Value::LangString { value, lang } => {
                write_quoted(f, value)?;
                write!(f, "@{lang}")
            }
            Value::TypedString { value, datatype } => {
                write_quoted(f, value)?;
                write!(f, "^^<{datatype}>")
            }
            Value::Int(i) => write!(f, "\"{i}\"^^<{XSD_INTEGER}>"),
            Value::Bool(b) => write!(f, "\"{b}\"^^<{XSD_BOOLEAN}>"),
            Value::Raw(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
