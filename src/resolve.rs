//! Second pass over a draft table: bind every scope reference to the scope
//! type of the subject it names, now that every subject is known.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::CommandError;
use crate::table::{
    ArgSpec, ArgType, CommandTable, DraftArg, DraftOperation, DraftSubject, DraftTable, Operation,
    Subject, UsagePart,
};
use crate::types::TypeRegistry;

/// Resolve `draft` against itself and `registry`.
///
/// Fails with a grammar error when a focus argument names an unknown or
/// compound subject, or when a subject's scope type is not registered.
pub fn resolve(draft: &DraftTable, registry: &TypeRegistry) -> Result<CommandTable, CommandError> {
    for subject in draft.subjects.values() {
        if let Some(scope) = &subject.scope {
            if !registry.contains(scope) {
                return Err(CommandError::grammar(format!(
                    "subject `{}` is scoped by undeclared type `{scope}`",
                    subject.canonical_name()
                )));
            }
        }
    }

    let mut subjects = IndexMap::with_capacity(draft.subjects.len());
    for (name, subject) in &draft.subjects {
        subjects.insert(name.clone(), resolve_subject(draft, registry, subject)?);
    }

    let table = CommandTable::from_subjects(subjects);
    debug!(
        subjects = table.len(),
        operations = table.operation_count(),
        "command table resolved"
    );
    Ok(table)
}

/// Scope type of the subject with canonical name `subject`.
fn scope_type<'a>(draft: &'a DraftTable, subject: &str) -> Result<&'a str, CommandError> {
    draft
        .subjects
        .get(subject)
        .and_then(|s| s.scope.as_deref())
        .ok_or_else(|| {
            CommandError::grammar(format!("cannot resolve scope type for `{subject}`"))
        })
}

fn resolve_subject(
    draft: &DraftTable,
    registry: &TypeRegistry,
    subject: &DraftSubject,
) -> Result<Subject, CommandError> {
    let mut ops = IndexMap::with_capacity(subject.ops.len());
    for (op_name, op) in &subject.ops {
        ops.insert(op_name.clone(), resolve_operation(draft, registry, subject, op_name, op)?);
    }
    Ok(Subject {
        names: subject.names.clone(),
        scope: subject.scope.clone(),
        ops,
    })
}

fn resolve_operation(
    draft: &DraftTable,
    registry: &TypeRegistry,
    subject: &DraftSubject,
    op_name: &str,
    op: &DraftOperation,
) -> Result<Operation, CommandError> {
    let mut usage = String::new();
    for part in &op.usage {
        match part {
            UsagePart::Text(text) => usage.push_str(text),
            UsagePart::Scope(referenced) => {
                usage.push('<');
                usage.push_str(scope_type(draft, referenced)?);
                usage.push('>');
            }
        }
    }

    let mut args = IndexMap::with_capacity(op.args.len());
    for (arg_name, arg) in &op.args {
        let spec = resolve_arg(draft, arg)?;
        if !registry.contains(&spec.value_type) {
            warn!(
                subject = subject.canonical_name(),
                op = op_name,
                arg = arg_name.as_str(),
                value_type = spec.value_type.as_str(),
                "argument type is not declared in [types]; calls will be rejected"
            );
        }
        args.insert(arg_name.clone(), spec);
    }

    Ok(Operation {
        call_name: op.call_name.clone(),
        usage: usage.trim().to_string(),
        args,
        output_fields: op.output_fields.clone(),
    })
}

fn resolve_arg(draft: &DraftTable, arg: &DraftArg) -> Result<ArgSpec, CommandError> {
    let (value_type, focus) = match &arg.ty {
        ArgType::Named(type_name) => (type_name.clone(), None),
        ArgType::Scope(subject) => (scope_type(draft, subject)?.to_string(), Some(subject.clone())),
    };
    Ok(ArgSpec {
        optional: arg.optional,
        backend_name: arg.backend_name.clone(),
        value_type,
        focus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::section::parse_document;
    use crate::table::{Purpose, build_draft};
    use anyhow::Result;

    fn build(types: &str, commands: &str) -> Result<CommandTable, CommandError> {
        let doc = parse_document(&format!("[types]\n{types}\n[commands]\n{commands}"))?;
        let registry = TypeRegistry::parse(doc.require("types")?)?;
        let draft = build_draft(doc.require("commands")?)?;
        resolve(&draft, &registry)
    }

    #[test]
    fn substitutes_scope_types_into_usage() -> Result<()> {
        let (registry, table) = fixtures::sample()?;
        let class = table.subject("class").unwrap();
        assert_eq!(class.ops["attach"].usage, "attach class [-d <name>]");
        assert_eq!(
            table.subject("domain").unwrap().ops["new"].usage,
            "new domain -ph <name> [-alias <short_name>]"
        );
        let arg = &class.ops["attach"].args["d"];
        assert_eq!(arg.purpose(), Purpose::Focus);
        assert_eq!(arg.value_type, "name");
        assert!(registry.contains(&arg.value_type));
        Ok(())
    }

    #[test]
    fn resolving_twice_gives_identical_tables() -> Result<()> {
        let doc = parse_document(fixtures::SAMPLE_SPEC)?;
        let registry = TypeRegistry::parse(doc.require("types")?)?;
        let draft = build_draft(doc.require("commands")?)?;
        assert_eq!(resolve(&draft, &registry)?, resolve(&draft, &registry)?);
        Ok(())
    }

    #[test]
    fn declaration_order_does_not_matter() -> Result<()> {
        let types = "name : string\nrnum : integer";
        let later = build(
            types,
            "rel : rnum\n  new : new_rel\n    f> [d|domain:domain]\ndomain : name\n  new : new_domain\n",
        )?;
        let earlier = build(
            types,
            "domain : name\n  new : new_domain\nrel : rnum\n  new : new_rel\n    f> [d|domain:domain]\n",
        )?;
        let usage = |t: &CommandTable| t.subject("rel").unwrap().ops["new"].usage.clone();
        assert_eq!(usage(&later), usage(&earlier));
        assert_eq!(usage(&later), "new rel [-d <name>]");
        Ok(())
    }

    #[test]
    fn unknown_scope_reference_is_named() {
        let err = build("name : string", "class : name\n  attach : attach\n    f> ghost\n").unwrap_err();
        assert_eq!(err.to_string(), "grammar error: cannot resolve scope type for `ghost`");
    }

    #[test]
    fn compound_subject_cannot_be_referenced() {
        let err = build("name : string", "model\n  show : show_model\nclass : name\n  new : new\n    f> model\n")
            .unwrap_err();
        assert!(err.to_string().contains("`model`"));
    }

    #[test]
    fn scope_type_must_be_registered() {
        let err = build("name : string", "domain : label\n  new : new_domain\n").unwrap_err();
        assert!(matches!(err, CommandError::Grammar(_)));
    }

    #[test]
    fn unknown_value_type_is_left_for_call_time() -> Result<()> {
        let table = build("name : string", "domain : name\n  new : new_domain\n    m> n:nosuch\n")?;
        assert_eq!(table.subject("domain").unwrap().ops["new"].usage, "new domain -n <nosuch>");
        Ok(())
    }
}
