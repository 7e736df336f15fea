//! Turns a user command `(subject, op, args)` into a validated backend call.

use serde::Serialize;
use tracing::debug;

use crate::error::CommandError;
use crate::focus::FocusStore;
use crate::table::CommandTable;
use crate::types::TypeRegistry;
use crate::value::{ArgMap, Value};

/// Argument key that asks for an operation's usage instead of running it.
pub const HELP_KEY: &str = "help";

/// Fully validated backend call ready for execution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallDescriptor {
    pub call_name: String,
    pub params: Vec<String>,
    pub values: Vec<Value>,
    pub output_fields: Option<Vec<String>>,
}

impl CallDescriptor {
    /// Call with parameter markers, e.g. `UI_new_domain(p_phrase:=%s)`.
    pub fn signature(&self, prefix: &str) -> String {
        let params = self
            .params
            .iter()
            .map(|p| format!("p_{p}:=%s"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{prefix}{}({params})", self.call_name)
    }

    /// Call with the values substituted, for verbose output.
    pub fn display(&self, prefix: &str) -> String {
        let params = self
            .params
            .iter()
            .zip(&self.values)
            .map(|(p, v)| {
                if v.is_textual() {
                    format!("p_{p}:='{v}'")
                } else {
                    format!("p_{p}:={v}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{prefix}{}({params})", self.call_name)
    }
}

/// Compiles commands against one table, registry, and focus store.
#[derive(Clone, Copy)]
pub struct CallCompiler<'a> {
    table: &'a CommandTable,
    registry: &'a TypeRegistry,
    defaults: &'a FocusStore,
}

impl<'a> CallCompiler<'a> {
    pub fn new(table: &'a CommandTable, registry: &'a TypeRegistry, defaults: &'a FocusStore) -> Self {
        Self {
            table,
            registry,
            defaults,
        }
    }

    pub fn compile(&self, subject: &str, op: &str, args: &ArgMap) -> Result<CallDescriptor, CommandError> {
        let subject_spec = self
            .table
            .subject(subject)
            .ok_or_else(|| CommandError::BadSubject(subject.to_string()))?;
        let op_spec = subject_spec.ops.get(op).ok_or_else(|| CommandError::BadOp {
            op: op.to_string(),
            subject: subject_spec.canonical_name().to_string(),
            valid: subject_spec.op_list(),
        })?;
        let usage = || CommandError::Syntax(op_spec.usage.clone());

        if args.contains_key(HELP_KEY) || args.keys().any(|k| !op_spec.args.contains_key(k)) {
            return Err(usage());
        }

        // Supplied arguments keep their order; defaults for omitted focus
        // arguments follow in declaration order.
        let mut present: Vec<(&str, Value)> =
            args.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        for (name, spec) in &op_spec.args {
            if args.contains_key(name) {
                continue;
            }
            let default = spec
                .focus
                .as_deref()
                .and_then(|focus| self.defaults.get(focus));
            match default {
                Some(value) => present.push((name.as_str(), value.clone())),
                None if spec.optional => {}
                None => return Err(usage()),
            }
        }

        let mut params = Vec::with_capacity(present.len());
        let mut values = Vec::with_capacity(present.len());
        for (name, raw) in present {
            let Some(spec) = op_spec.args.get(name) else {
                return Err(usage());
            };
            let param = spec.param_name(name);
            let type_error = || CommandError::ArgType {
                param: param.to_string(),
                expected: spec.value_type.clone(),
            };
            let validator = self.registry.get(&spec.value_type).ok_or_else(type_error)?;
            let value = validator.check(&raw).ok_or_else(type_error)?;
            params.push(param.to_string());
            values.push(value);
        }

        let call = CallDescriptor {
            call_name: op_spec.call_name.clone(),
            params,
            values,
            output_fields: op_spec.output_fields.clone(),
        };
        debug!(subject = subject_spec.canonical_name(), op, call = %call.signature(""), "compiled call");
        Ok(call)
    }
}
