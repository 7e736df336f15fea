//! Line and token grammar of the `[commands]` section.
//!
//! Lines are classified in a fixed order (subject, operation, arguments) and
//! argument tokens are tried against an ordered list of forms, richest first.
//! Every form must consume the whole token; there is no partial matching.

use crate::error::CommandError;
use crate::section::SpecLine;

/// Purpose code at the head of an argument line (`f>`, `m>`, `o>`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgPurpose {
    Focus,
    Modify,
    Output,
}

impl ArgPurpose {
    fn from_code(code: char) -> Option<ArgPurpose> {
        match code {
            'f' => Some(ArgPurpose::Focus),
            'm' => Some(ArgPurpose::Modify),
            'o' => Some(ArgPurpose::Output),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArgPurpose::Focus => "focus",
            ArgPurpose::Modify => "modify",
            ArgPurpose::Output => "output",
        }
    }
}

/// Structural kind of one line of the `[commands]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `domain, d : name` (not indented).
    Subject {
        names: Vec<&'a str>,
        scope: Option<&'a str>,
    },
    /// `    new : new_domain`
    Operation { name: &'a str, call: &'a str },
    /// `    m> ph|phrase:name, [x:text]`
    Arguments {
        purpose: ArgPurpose,
        tokens: Vec<&'a str>,
    },
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_word_char)
}

fn grammar_error(line: &SpecLine, message: impl std::fmt::Display) -> CommandError {
    CommandError::grammar(format!("line {}: {message}: `{}`", line.number, line.text.trim()))
}

pub fn classify(line: &SpecLine) -> Result<LineKind<'_>, CommandError> {
    let text = line.text.as_str();
    let indented = text.starts_with(char::is_whitespace);

    if !indented {
        if text.starts_with(is_word_char) {
            return parse_subject(text).ok_or_else(|| grammar_error(line, "malformed subject line"));
        }
    } else if let Some(kind) = parse_operation(text.trim()) {
        return Ok(kind);
    } else if let Some(kind) = parse_arguments(line)? {
        return Ok(kind);
    }

    Err(grammar_error(line, "unrecognized command line"))
}

fn parse_subject(text: &str) -> Option<LineKind<'_>> {
    let (names_part, scope) = match text.split_once(':') {
        Some((names, scope)) => {
            let scope = scope.trim();
            if !is_identifier(scope) {
                return None;
            }
            (names, Some(scope))
        }
        None => (text, None),
    };

    let names: Vec<&str> = names_part
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() || !names.iter().all(|n| is_identifier(n)) {
        return None;
    }
    Some(LineKind::Subject { names, scope })
}

fn parse_operation(text: &str) -> Option<LineKind<'_>> {
    let (name, call) = text.split_once(':')?;
    let (name, call) = (name.trim(), call.trim());
    (is_identifier(name) && is_identifier(call)).then_some(LineKind::Operation { name, call })
}

fn parse_arguments(line: &SpecLine) -> Result<Option<LineKind<'_>>, CommandError> {
    let text = line.text.trim();
    let mut chars = text.chars();
    let (Some(code), Some('>')) = (chars.next(), chars.next()) else {
        return Ok(None);
    };
    let Some(purpose) = ArgPurpose::from_code(code) else {
        return Ok(None);
    };

    let tokens: Vec<&str> = text[2..]
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(grammar_error(line, format!("{} line lists no arguments", purpose.as_str())));
    }
    Ok(Some(LineKind::Arguments { purpose, tokens }))
}

/// Fields pulled out of one argument token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenFields<'a> {
    pub optional: bool,
    /// Name the user types on the command line (`-ph`).
    pub ui: Option<&'a str>,
    /// Backend parameter name overriding the UI name.
    pub app: Option<&'a str>,
    /// Scope subject for focus tokens, type name for modify tokens, field for output tokens.
    pub target: &'a str,
}

pub type TokenForm = for<'a> fn(&'a str) -> Option<TokenFields<'a>>;

/// `[ui|app:scope]`, `ui|app:scope`, `[ui:scope]`, `ui:scope`, `scope`
pub const FOCUS_FORMS: &[(&str, TokenForm)] = &[
    ("optional override", optional_override),
    ("override", override_form),
    ("optional alias", optional_alias),
    ("alias", alias_form),
    ("bare", bare_form),
];

/// Modify tokens always name themselves; the target is a literal type.
pub const MODIFY_FORMS: &[(&str, TokenForm)] = &[
    ("optional override", optional_override),
    ("override", override_form),
    ("optional alias", optional_alias),
    ("alias", alias_form),
];

pub const OUTPUT_FORMS: &[(&str, TokenForm)] = &[("bare", bare_form)];

pub fn forms_for(purpose: ArgPurpose) -> &'static [(&'static str, TokenForm)] {
    match purpose {
        ArgPurpose::Focus => FOCUS_FORMS,
        ArgPurpose::Modify => MODIFY_FORMS,
        ArgPurpose::Output => OUTPUT_FORMS,
    }
}

/// Try each form in priority order; the first that accepts the token wins.
pub fn match_token(purpose: ArgPurpose, token: &str) -> Option<TokenFields<'_>> {
    forms_for(purpose).iter().find_map(|(_, form)| form(token))
}

fn optional(token: &str) -> Option<&str> {
    token.strip_prefix('[')?.strip_suffix(']')
}

fn optional_override(token: &str) -> Option<TokenFields<'_>> {
    let fields = override_form(optional(token)?)?;
    Some(TokenFields {
        optional: true,
        ..fields
    })
}

fn override_form(token: &str) -> Option<TokenFields<'_>> {
    let (names, target) = token.split_once(':')?;
    let (ui, app) = names.split_once('|')?;
    (is_identifier(ui) && is_identifier(app) && is_identifier(target)).then_some(TokenFields {
        optional: false,
        ui: Some(ui),
        app: Some(app),
        target,
    })
}

fn optional_alias(token: &str) -> Option<TokenFields<'_>> {
    let fields = alias_form(optional(token)?)?;
    Some(TokenFields {
        optional: true,
        ..fields
    })
}

fn alias_form(token: &str) -> Option<TokenFields<'_>> {
    let (ui, target) = token.split_once(':')?;
    (is_identifier(ui) && is_identifier(target)).then_some(TokenFields {
        optional: false,
        ui: Some(ui),
        app: None,
        target,
    })
}

fn bare_form(token: &str) -> Option<TokenFields<'_>> {
    is_identifier(token).then_some(TokenFields {
        optional: false,
        ui: None,
        app: None,
        target: token,
    })
}
