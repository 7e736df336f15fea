//! Argument values as they travel from the command line to the backend.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// Raw or coerced argument value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Comma separated UI value, e.g. `-subclasses On Duty, Off Duty`.
    List(Vec<String>),
}

/// Arguments keyed by their UI name, in the order they were supplied.
pub type ArgMap = IndexMap<String, Value>;

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Value::Text(_) | Value::List(_))
    }

    /// Spelling used when checking membership of an enumerated type:
    /// `True`/`False` for flags and a trailing `.0` on whole floats.
    pub fn member_key(&self) -> String {
        match self {
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => format!("{x:.1}"),
            other => other.to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{text}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}
