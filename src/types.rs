//! Type registry: maps application type names to UI value validators.
//!
//! The `[types]` section pairs each application type with a UI type:
//!
//! ```text
//! name     : string
//! rnum     : integer
//! kind     : [public|private]
//! ```

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::error::CommandError;
use crate::section::SpecLine;
use crate::value::Value;

const TRUE_WORDS: [&str; 4] = ["true", "yes", "t", "1"];
const FALSE_WORDS: [&str; 4] = ["false", "no", "f", "0"];

/// Checks, and where possible coerces, a raw value for one application type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validator {
    Integer,
    Float,
    String,
    Boolean,
    EnumSet(BTreeSet<String>),
}

impl Validator {
    /// Return the primitive atom for this validator (`None` for enumerated sets).
    pub fn as_atom(&self) -> Option<&'static str> {
        match self {
            Validator::Integer => Some("integer"),
            Validator::Float => Some("float"),
            Validator::String => Some("string"),
            Validator::Boolean => Some("bool"),
            Validator::EnumSet(_) => None,
        }
    }

    /// Parse a UI type: a primitive atom or a bracketed `[a|b|c]` literal set.
    pub fn from_ui_type(ui_type: &str) -> Option<Validator> {
        let ui_type = ui_type.trim();
        if let Some(inner) = ui_type.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let members: BTreeSet<String> = inner
                .split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            return (!members.is_empty()).then_some(Validator::EnumSet(members));
        }
        match ui_type {
            "integer" => Some(Validator::Integer),
            "float" => Some(Validator::Float),
            "string" => Some(Validator::String),
            "bool" => Some(Validator::Boolean),
            _ => None,
        }
    }

    /// Validate `value`, returning the coerced value on success.
    pub fn check(&self, value: &Value) -> Option<Value> {
        match self {
            Validator::Boolean => check_bool(value),
            Validator::Integer => check_integer(value),
            Validator::Float => check_float(value),
            Validator::String => value.as_text().map(Value::text),
            Validator::EnumSet(members) => {
                let text = value.member_key();
                members.contains(&text).then_some(Value::Text(text))
            }
        }
    }

    pub fn members(&self) -> Option<&BTreeSet<String>> {
        match self {
            Validator::EnumSet(members) => Some(members),
            _ => None,
        }
    }
}

fn check_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Int(n) => Some(Value::Bool(*n != 0)),
        Value::Text(text) => {
            let lowered = text.trim().to_lowercase();
            if TRUE_WORDS.contains(&lowered.as_str()) {
                Some(Value::Bool(true))
            } else if FALSE_WORDS.contains(&lowered.as_str()) {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        Value::Float(_) | Value::List(_) => None,
    }
}

fn check_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Int(n) => Some(Value::Int(*n)),
        Value::Bool(b) => Some(Value::Int(i64::from(*b))),
        Value::Float(x) if x.is_finite() => Some(Value::Int(x.trunc() as i64)),
        Value::Text(text) => text.trim().parse::<i64>().ok().map(Value::Int),
        _ => None,
    }
}

fn check_float(value: &Value) -> Option<Value> {
    match value {
        Value::Float(x) => Some(Value::Float(*x)),
        Value::Int(n) => Some(Value::Float(*n as f64)),
        Value::Bool(b) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Text(text) => text.trim().parse::<f64>().ok().map(Value::Float),
        Value::List(_) => None,
    }
}

/// Application type name → validator, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, Validator>,
}

impl TypeRegistry {
    /// Build the registry from the lines of a `[types]` section.
    pub fn parse(lines: &[SpecLine]) -> Result<Self, CommandError> {
        let mut registry = TypeRegistry::default();
        for line in lines {
            let parts: Vec<&str> = line.text.split(':').collect();
            let [app_type, ui_type] = parts.as_slice() else {
                return Err(CommandError::grammar(format!(
                    "line {}: expected `app_type : ui_type`, found `{}`",
                    line.number,
                    line.text.trim()
                )));
            };
            let app_type = app_type.trim();
            if app_type.is_empty() {
                return Err(CommandError::grammar(format!(
                    "line {}: missing application type name",
                    line.number
                )));
            }
            let validator = Validator::from_ui_type(ui_type).ok_or_else(|| {
                CommandError::grammar(format!(
                    "line {}: unknown ui type `{}` for `{app_type}`",
                    line.number,
                    ui_type.trim()
                ))
            })?;
            registry.insert(app_type, validator).map_err(|name| {
                CommandError::grammar(format!("line {}: type `{name}` declared twice", line.number))
            })?;
        }
        Ok(registry)
    }

    /// Register a type; returns the name back if it is already taken.
    pub fn insert(&mut self, name: &str, validator: Validator) -> Result<(), String> {
        if self.types.contains_key(name) {
            return Err(name.to_string());
        }
        self.types.insert(name.to_string(), validator);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Validator> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Validator)> {
        self.types.iter().map(|(name, v)| (name.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn lines(texts: &[&str]) -> Vec<SpecLine> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| SpecLine::new(i + 1, *t))
            .collect()
    }

    #[test]
    fn parses_primitives_and_sets() -> Result<()> {
        let registry = TypeRegistry::parse(&lines(&[
            "name : string",
            "rnum:integer",
            "ratio : float",
            "flag : bool",
            "kind : [public | private]",
        ]))?;
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get("rnum"), Some(&Validator::Integer));
        let members = registry.get("kind").and_then(Validator::members).unwrap();
        assert!(members.contains("public") && members.contains("private"));
        Ok(())
    }

    #[test]
    fn rejects_malformed_lines() {
        for bad in ["name string", "a : b : c", "name : text", " : string", "e : []"] {
            let err = TypeRegistry::parse(&lines(&[bad])).unwrap_err();
            assert!(matches!(err, CommandError::Grammar(_)), "{bad}");
        }
        assert!(TypeRegistry::parse(&lines(&["a : string", "a : integer"])).is_err());
    }

    #[test]
    fn bool_coercion() {
        let v = Validator::Boolean;
        assert_eq!(v.check(&Value::text("Yes")), Some(Value::Bool(true)));
        assert_eq!(v.check(&Value::text("f")), Some(Value::Bool(false)));
        assert_eq!(v.check(&Value::Int(7)), Some(Value::Bool(true)));
        assert_eq!(v.check(&Value::Int(0)), Some(Value::Bool(false)));
        assert_eq!(v.check(&Value::Bool(true)), Some(Value::Bool(true)));
        assert_eq!(v.check(&Value::text("maybe")), None);
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Validator::Integer.check(&Value::text(" 42 ")), Some(Value::Int(42)));
        assert_eq!(Validator::Integer.check(&Value::text("4.2")), None);
        assert_eq!(Validator::Float.check(&Value::text("4.5")), Some(Value::Float(4.5)));
        assert_eq!(Validator::Float.check(&Value::Int(2)), Some(Value::Float(2.0)));
        assert_eq!(Validator::Float.check(&Value::text("abc")), None);
    }

    #[test]
    fn string_accepts_only_text() {
        assert_eq!(Validator::String.check(&Value::text("ATC")), Some(Value::text("ATC")));
        // A flag given without its value arrives as `true`.
        assert_eq!(Validator::String.check(&Value::Bool(true)), None);
        assert_eq!(Validator::String.check(&Value::List(vec!["a".into()])), None);
    }

    #[test]
    fn enum_membership_stringifies_first() {
        let v = Validator::from_ui_type("[1|2|red]").unwrap();
        assert_eq!(v.check(&Value::Int(2)), Some(Value::text("2")));
        assert_eq!(v.check(&Value::text("red")), Some(Value::text("red")));
        assert_eq!(v.check(&Value::text("neon")), None);
    }

    #[test]
    fn enum_membership_of_flags_and_floats() {
        let v = Validator::from_ui_type("[True|False]").unwrap();
        assert_eq!(v.check(&Value::Bool(true)), Some(Value::text("True")));
        assert_eq!(v.check(&Value::Bool(false)), Some(Value::text("False")));
        assert_eq!(v.check(&Value::text("true")), None);

        let v = Validator::from_ui_type("[1.0|2.5]").unwrap();
        assert_eq!(v.check(&Value::Float(1.0)), Some(Value::text("1.0")));
        assert_eq!(v.check(&Value::Float(2.5)), Some(Value::text("2.5")));
    }
}
