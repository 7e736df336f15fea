//! Splits a specification document into named sections of significant lines.
//!
//! ```text
//! [types]
//! name : string          # trailing comments are dropped
//! [commands]
//! domain, d : name
//!     new : new_domain
//! ```
//!
//! Indentation is kept because the command grammar depends on it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::error::CommandError;

pub const COMMENT_CHAR: char = '#';

/// A non-blank, comment-free line together with its 1-based position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecLine {
    pub number: usize,
    pub text: String,
}

impl SpecLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SpecDocument {
    sections: IndexMap<String, Vec<SpecLine>>,
}

impl SpecDocument {
    pub fn section(&self, name: &str) -> Option<&[SpecLine]> {
        self.sections.get(name).map(Vec::as_slice)
    }

    pub fn require(&self, name: &str) -> Result<&[SpecLine], CommandError> {
        self.section(name)
            .ok_or_else(|| CommandError::grammar(format!("missing [{name}] section")))
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

/// Remove a trailing comment and trailing whitespace; `None` if nothing is left.
pub fn strip_comment(raw: &str) -> Option<&str> {
    let content = raw.split(COMMENT_CHAR).next().unwrap_or("").trim_end();
    if content.trim_start().is_empty() {
        None
    } else {
        Some(content)
    }
}

pub fn parse_document(input: &str) -> Result<SpecDocument, CommandError> {
    let mut doc = SpecDocument::default();
    let mut current: Option<String> = None;

    for (idx, raw) in input.lines().enumerate() {
        let number = idx + 1;
        let Some(content) = strip_comment(raw) else {
            continue;
        };

        if content.starts_with('[') {
            let name = parse_header(content).ok_or_else(|| {
                CommandError::grammar(format!("line {number}: malformed section header `{content}`"))
            })?;
            if doc.sections.contains_key(name) {
                return Err(CommandError::grammar(format!(
                    "line {number}: section [{name}] appears twice"
                )));
            }
            doc.sections.insert(name.to_string(), Vec::new());
            current = Some(name.to_string());
            continue;
        }

        let Some(section) = current.as_ref().and_then(|name| doc.sections.get_mut(name)) else {
            return Err(CommandError::grammar(format!(
                "line {number}: content before the first section header"
            )));
        };
        section.push(SpecLine::new(number, content));
    }

    Ok(doc)
}

pub fn read_document(path: &Path) -> Result<SpecDocument> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read specification {}", path.display()))?;
    parse_document(&contents)
        .with_context(|| format!("invalid specification {}", path.display()))
}

fn parse_header(content: &str) -> Option<&str> {
    let name = content.strip_prefix('[')?.strip_suffix(']')?.trim();
    let is_ident = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    is_ident.then_some(name)
}
