//! Error taxonomy shared by the specification compiler and the call compiler.

use std::collections::BTreeSet;

use thiserror::Error;

/// Usage shown when a command line cannot even be split into op and subject.
pub const COMMAND_USAGE: &str = "<op> <subject> [<args>]";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// The specification document is malformed; no usable table exists.
    #[error("grammar error: {0}")]
    Grammar(String),

    #[error("unknown subject `{0}`")]
    BadSubject(String),

    #[error("`{op}` is not an operation on {subject}; try one of: {valid}")]
    BadOp {
        op: String,
        subject: String,
        valid: String,
    },

    /// Carries the usage text of the operation (or of the whole command line).
    #[error("usage: {0}")]
    Syntax(String),

    #[error("argument `{param}` is not a valid <{expected}>")]
    ArgType { param: String, expected: String },

    #[error("`{value}` is not a legal value for {subject}; choose from: {}", join_set(.allowed))]
    BadSetValue {
        subject: String,
        value: String,
        allowed: BTreeSet<String>,
    },

    #[error("{0} is a compound subject and cannot take a focus value")]
    CompoundSubject(String),
}

impl CommandError {
    pub(crate) fn grammar(message: impl Into<String>) -> Self {
        CommandError::Grammar(message.into())
    }

    /// Everything but a grammar error can be shown to the user and retried.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CommandError::Grammar(_))
    }
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_grammar_errors_are_fatal() {
        assert!(!CommandError::grammar("boom").is_recoverable());
        assert!(CommandError::BadSubject("x".into()).is_recoverable());
        assert!(CommandError::Syntax("new domain".into()).is_recoverable());
    }

    #[test]
    fn bad_set_value_lists_members() {
        let err = CommandError::BadSetValue {
            subject: "color".into(),
            value: "neon".into(),
            allowed: ["red", "green", "blue"].iter().map(|s| s.to_string()).collect(),
        };
        assert_eq!(
            err.to_string(),
            "`neon` is not a legal value for color; choose from: blue | green | red"
        );
    }
}
