//! Per-subject "current value" used to fill in omitted focus arguments.
//!
//! Values are stored exactly as given; coercion to the subject's scope type
//! happens only when a call consumes them. Presence is tracked by the map
//! itself, so an empty or false value still counts as set.

use std::collections::HashMap;

use tracing::warn;

use crate::error::CommandError;
use crate::table::{CommandTable, Subject};
use crate::types::TypeRegistry;
use crate::value::Value;

#[derive(Clone, Debug, Default)]
pub struct FocusStore {
    /// Canonical subject name → value.
    values: HashMap<String, Value>,
}

fn scoped_subject<'t>(table: &'t CommandTable, subject: &str) -> Result<&'t Subject, CommandError> {
    let found = table
        .subject(subject)
        .ok_or_else(|| CommandError::BadSubject(subject.to_string()))?;
    if found.is_compound() {
        return Err(CommandError::CompoundSubject(found.canonical_name().to_string()));
    }
    Ok(found)
}

impl FocusStore {
    /// Raw lookup by canonical subject name.
    pub fn get(&self, subject: &str) -> Option<&Value> {
        self.values.get(subject)
    }

    pub fn get_default<'s>(
        &'s self,
        table: &CommandTable,
        subject: &str,
    ) -> Result<(String, Option<&'s Value>), CommandError> {
        let found = scoped_subject(table, subject)?;
        let name = found.canonical_name();
        Ok((name.to_string(), self.values.get(name)))
    }

    /// Every focus value currently set, in command table order.
    pub fn all_defaults<'s>(&'s self, table: &CommandTable) -> Vec<(String, &'s Value)> {
        table
            .subjects()
            .filter_map(|s| {
                let name = s.canonical_name();
                self.values.get(name).map(|v| (name.to_string(), v))
            })
            .collect()
    }

    pub fn set_default(
        &mut self,
        table: &CommandTable,
        registry: &TypeRegistry,
        subject: &str,
        value: Value,
    ) -> Result<(), CommandError> {
        let found = scoped_subject(table, subject)?;
        let name = found.canonical_name();
        let members = found
            .scope
            .as_deref()
            .and_then(|scope| registry.get(scope))
            .and_then(|validator| validator.members());
        if let Some(allowed) = members {
            let text = value.member_key();
            if !allowed.contains(&text) {
                return Err(CommandError::BadSetValue {
                    subject: name.to_string(),
                    value: text,
                    allowed: allowed.clone(),
                });
            }
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Clear one subject's value, or every value when `subject` is `None`.
    pub fn clear_default(&mut self, table: &CommandTable, subject: Option<&str>) -> Result<(), CommandError> {
        match subject {
            None => self.values.clear(),
            Some(subject) => {
                let name = table
                    .canonical_name(subject)
                    .ok_or_else(|| CommandError::BadSubject(subject.to_string()))?;
                self.values.remove(name);
            }
        }
        Ok(())
    }

    /// Drop values that no longer fit a freshly built table.
    pub fn retain_valid(&mut self, table: &CommandTable, registry: &TypeRegistry) {
        let previous = std::mem::take(&mut self.values);
        for (subject, value) in previous {
            match self.set_default(table, registry, &subject, value) {
                Ok(()) => {}
                Err(err) => warn!(subject = subject.as_str(), %err, "dropping focus value after refresh"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
