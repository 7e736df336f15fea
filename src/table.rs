//! Command table: subjects, their operations, and typed arguments.
//!
//! Building happens in two stages. [`build_draft`] runs the line state
//! machine over the `[commands]` section and produces a [`DraftTable`] whose
//! focus arguments are still unresolved scope references (a subject may be
//! referenced before it is declared). [`crate::resolve::resolve`] then turns
//! the draft into a [`CommandTable`] with concrete types and usage text.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::CommandError;
use crate::grammar::{self, ArgPurpose, LineKind};
use crate::section::SpecLine;

/// What an argument is for once the table is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Focus,
    Modify,
}

/// Type of a draft argument: a literal type or a reference to a subject's scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgType {
    Named(String),
    Scope(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftArg {
    pub optional: bool,
    pub backend_name: Option<String>,
    pub ty: ArgType,
}

/// A piece of usage text; scope references are filled in by the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsagePart {
    Text(String),
    Scope(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DraftOperation {
    pub call_name: String,
    pub usage: Vec<UsagePart>,
    pub args: IndexMap<String, DraftArg>,
    pub output_fields: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DraftSubject {
    pub names: Vec<String>,
    pub scope: Option<String>,
    pub ops: IndexMap<String, DraftOperation>,
}

impl DraftSubject {
    pub fn canonical_name(&self) -> &str {
        &self.names[0]
    }
}

/// Output of the first pass: complete structure, unresolved focus types.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DraftTable {
    pub subjects: IndexMap<String, DraftSubject>,
}

/// A resolved argument declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArgSpec {
    pub optional: bool,
    /// Backend parameter name when it differs from the UI name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_name: Option<String>,
    /// Application type used to validate the value.
    pub value_type: String,
    /// Subject whose focus value can stand in for this argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

impl ArgSpec {
    pub fn purpose(&self) -> Purpose {
        if self.focus.is_some() {
            Purpose::Focus
        } else {
            Purpose::Modify
        }
    }

    pub fn param_name<'a>(&'a self, arg_name: &'a str) -> &'a str {
        self.backend_name.as_deref().unwrap_or(arg_name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Operation {
    pub call_name: String,
    pub usage: String,
    pub args: IndexMap<String, ArgSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_fields: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Subject {
    /// Canonical name first, then aliases.
    pub names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub ops: IndexMap<String, Operation>,
}

impl Subject {
    pub fn canonical_name(&self) -> &str {
        &self.names[0]
    }

    /// Subjects without a scope type are addressed only through their operations.
    pub fn is_compound(&self) -> bool {
        self.scope.is_none()
    }

    /// Operation names joined the way error messages list them.
    pub fn op_list(&self) -> String {
        self.ops.keys().map(String::as_str).collect::<Vec<_>>().join(" | ")
    }
}

/// The resolved, read-only command table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CommandTable {
    subjects: IndexMap<String, Subject>,
}

impl CommandTable {
    pub(crate) fn from_subjects(subjects: IndexMap<String, Subject>) -> Self {
        Self { subjects }
    }

    /// Find a subject by canonical name or any alias.
    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.get(name).or_else(|| {
            self.subjects
                .values()
                .find(|s| s.names.iter().any(|n| n == name))
        })
    }

    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.subject(name).map(Subject::canonical_name)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.values()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.subjects.values().map(|s| s.ops.len()).sum()
    }

    /// Command listing for the help screen.
    pub fn help_text(&self, title: &str) -> String {
        let mut out = format!("{title} Commands\n---\n\n");
        for subject in self.subjects.values() {
            out.push_str(&subject.names.join(" / "));
            out.push_str(":\n");
            for op in subject.ops.values() {
                out.push_str("   ");
                out.push_str(&op.usage);
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str("---\n");
        out
    }
}

/// Builder state: what the most recent structural line opened.
enum State {
    Start,
    Subject(DraftSubject),
    Operation {
        subject: DraftSubject,
        name: String,
        op: DraftOperation,
    },
}

struct Builder {
    table: DraftTable,
    /// Every subject name or alias seen so far → canonical name.
    names: HashMap<String, String>,
}

/// First pass: turn the `[commands]` section into a draft table.
pub fn build_draft(lines: &[SpecLine]) -> Result<DraftTable, CommandError> {
    let mut builder = Builder {
        table: DraftTable::default(),
        names: HashMap::new(),
    };
    let mut state = State::Start;

    for line in lines {
        state = match grammar::classify(line)? {
            LineKind::Subject { names, scope } => builder.on_subject(state, line, &names, scope)?,
            LineKind::Operation { name, call } => builder.on_operation(state, line, name, call)?,
            LineKind::Arguments { purpose, tokens } => {
                builder.on_arguments(state, line, purpose, &tokens)?
            }
        };
    }

    builder.finish(state)
}

impl Builder {
    fn on_subject(
        &mut self,
        state: State,
        line: &SpecLine,
        names: &[&str],
        scope: Option<&str>,
    ) -> Result<State, CommandError> {
        self.close(state)?;

        let canonical = names[0];
        for name in names {
            if let Some(owner) = self.names.get(*name) {
                return Err(CommandError::grammar(format!(
                    "line {}: name `{name}` already used by subject `{owner}`",
                    line.number
                )));
            }
            self.names.insert(name.to_string(), canonical.to_string());
        }

        Ok(State::Subject(DraftSubject {
            names: names.iter().map(|n| n.to_string()).collect(),
            scope: scope.map(str::to_string),
            ops: IndexMap::new(),
        }))
    }

    fn on_operation(
        &mut self,
        state: State,
        line: &SpecLine,
        name: &str,
        call: &str,
    ) -> Result<State, CommandError> {
        let mut subject = match state {
            State::Start => {
                return Err(CommandError::grammar(format!(
                    "line {}: operation `{name}` found before any subject",
                    line.number
                )));
            }
            State::Subject(subject) => subject,
            State::Operation {
                mut subject,
                name: previous,
                op,
            } => {
                subject.ops.insert(previous, op);
                subject
            }
        };

        if subject.ops.contains_key(name) {
            return Err(CommandError::grammar(format!(
                "line {}: operation `{name}` defined twice for subject `{}`",
                line.number,
                subject.canonical_name()
            )));
        }

        let op = DraftOperation {
            call_name: call.to_string(),
            usage: vec![UsagePart::Text(format!("{name} {} ", subject.canonical_name()))],
            args: IndexMap::new(),
            output_fields: None,
        };
        Ok(State::Operation {
            subject,
            name: name.to_string(),
            op,
        })
    }

    fn on_arguments(
        &mut self,
        state: State,
        line: &SpecLine,
        purpose: ArgPurpose,
        tokens: &[&str],
    ) -> Result<State, CommandError> {
        let State::Operation {
            subject,
            name,
            mut op,
        } = state
        else {
            return Err(CommandError::grammar(format!(
                "line {}: arguments outside of an operation",
                line.number
            )));
        };

        for token in tokens {
            add_argument(&mut op, line, purpose, token)?;
        }
        Ok(State::Operation { subject, name, op })
    }

    /// Fold whatever the state holds back into the table.
    fn close(&mut self, state: State) -> Result<(), CommandError> {
        match state {
            State::Start => Ok(()),
            State::Subject(subject) => Err(CommandError::grammar(format!(
                "subject `{}` has no operations defined",
                subject.canonical_name()
            ))),
            State::Operation {
                mut subject,
                name,
                op,
            } => {
                subject.ops.insert(name, op);
                let canonical = subject.canonical_name().to_string();
                self.table.subjects.insert(canonical, subject);
                Ok(())
            }
        }
    }

    fn finish(mut self, state: State) -> Result<DraftTable, CommandError> {
        self.close(state)?;
        Ok(self.table)
    }
}

fn add_argument(
    op: &mut DraftOperation,
    line: &SpecLine,
    purpose: ArgPurpose,
    token: &str,
) -> Result<(), CommandError> {
    let fields = grammar::match_token(purpose, token).ok_or_else(|| {
        CommandError::grammar(format!(
            "line {}: no {} pattern matches argument `{token}` in `{}`",
            line.number,
            purpose.as_str(),
            line.text.trim()
        ))
    })?;

    let (arg_name, ty) = match purpose {
        ArgPurpose::Output => {
            op.output_fields
                .get_or_insert_with(Vec::new)
                .push(fields.target.to_string());
            return Ok(());
        }
        ArgPurpose::Focus => (
            fields.ui.unwrap_or(fields.target),
            ArgType::Scope(fields.target.to_string()),
        ),
        ArgPurpose::Modify => {
            let ui = fields.ui.ok_or_else(|| {
                CommandError::grammar(format!(
                    "line {}: modify argument `{token}` needs a name",
                    line.number
                ))
            })?;
            (ui, ArgType::Named(fields.target.to_string()))
        }
    };

    if arg_name == "help" || op.args.contains_key(arg_name) {
        return Err(CommandError::grammar(format!(
            "line {}: argument `{arg_name}` cannot be declared here",
            line.number
        )));
    }

    let (open, close) = if fields.optional { ("[", "] ") } else { ("", " ") };
    op.usage.push(UsagePart::Text(format!("{open}-{arg_name} ")));
    op.usage.push(match &ty {
        ArgType::Named(type_name) => UsagePart::Text(format!("<{type_name}>")),
        ArgType::Scope(subject) => UsagePart::Scope(subject.clone()),
    });
    op.usage.push(UsagePart::Text(close.to_string()));

    op.args.insert(
        arg_name.to_string(),
        DraftArg {
            optional: fields.optional,
            backend_name: fields.app.map(str::to_string),
            ty,
        },
    );
    Ok(())
}
