//! Command-line argument syntax of the editor: `-name value -flag -list a, b`.

use crate::compile::HELP_KEY;
use crate::error::{COMMAND_USAGE, CommandError};
use crate::grammar::is_word_char;
use crate::value::{ArgMap, Value};

/// How an item was written; UI commands accept only some shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemShape {
    Flag,
    Value,
    List,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArgItem {
    pub name: String,
    pub value: Value,
    pub shape: ItemShape,
}

/// Split `text` into `-name [value]` items.
pub fn parse_items(text: &str) -> Result<Vec<ArgItem>, CommandError> {
    let cleaned: String = text.chars().filter(|c| *c != '\'' && *c != '"').collect();
    let mut rest = cleaned.trim();
    let mut items = Vec::new();

    while !rest.is_empty() {
        let body = rest
            .strip_prefix('-')
            .ok_or_else(|| CommandError::Syntax(COMMAND_USAGE.to_string()))?;
        let name_len = body
            .find(|c: char| !is_word_char(c))
            .unwrap_or(body.len());
        if name_len == 0 {
            return Err(CommandError::Syntax(COMMAND_USAGE.to_string()));
        }
        let (name, after) = body.split_at(name_len);
        let value_end = next_item_start(after).unwrap_or(after.len());
        let (raw_value, remainder) = after.split_at(value_end);
        let raw_value = raw_value.trim();

        let (value, shape) = if raw_value.is_empty() {
            (Value::Bool(true), ItemShape::Flag)
        } else if raw_value.contains(',') {
            let list = raw_value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            (Value::List(list), ItemShape::List)
        } else {
            (Value::text(raw_value), ItemShape::Value)
        };
        items.push(ArgItem {
            name: name.to_string(),
            value,
            shape,
        });
        rest = remainder.trim_start();
    }

    Ok(items)
}

/// Offset of the next whitespace-preceded `-<word char>`, if any.
fn next_item_start(text: &str) -> Option<usize> {
    let mut prev_is_space = true;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if c == '-' && prev_is_space {
            if let Some((_, next)) = chars.peek() {
                if is_word_char(*next) {
                    return Some(idx);
                }
            }
        }
        prev_is_space = c.is_whitespace();
    }
    None
}

/// Arguments for an application command. Any `?` asks for usage.
pub fn parse_arg_text(text: &str) -> Result<ArgMap, CommandError> {
    let mut args = ArgMap::new();
    if text.contains('?') {
        args.insert(HELP_KEY.to_string(), Value::Bool(true));
        return Ok(args);
    }
    for item in parse_items(text)? {
        args.insert(item.name, item.value);
    }
    Ok(args)
}
