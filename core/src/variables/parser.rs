//! Template tokenizer
//!
//! Splits a template into literal text and variable handles:
//! - `$name` / `$name[arg, arg]` - built-in variables
//! - `&name` / `&name[path, to, value]` - effect output aliases
//!
//! Arguments are split on top-level commas only; bracket depth is tracked so
//! an argument may itself contain `$other[a, b]`. Sigils, identifiers and
//! delimiters are all ASCII, so byte scanning never splits a UTF-8 sequence.

use super::VariableError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sigil {
    /// `$name`
    Dollar,
    /// `&name`
    Ampersand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle<'a> {
    pub sigil: Sigil,
    pub name: &'a str,
    /// Raw (unresolved) arguments, whitespace-trimmed
    pub args: Vec<&'a str>,
    /// Byte range of the whole handle in the template
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Handle(Handle<'a>),
}

/// Tokenize a template. Fails only on an opening `[` without its `]`.
pub fn parse(template: &str) -> Result<Vec<Segment<'_>>, VariableError> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < template.len() {
        match handle_at(template, i)? {
            Some(handle) => {
                if text_start < handle.start {
                    segments.push(Segment::Text(&template[text_start..handle.start]));
                }
                i = handle.end;
                text_start = i;
                segments.push(Segment::Handle(handle));
            }
            None => i += 1,
        }
    }

    if text_start < template.len() {
        segments.push(Segment::Text(&template[text_start..]));
    }

    Ok(segments)
}

/// Cheap check used to skip work for plain strings
pub fn contains_handle(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .any(|(i, b)| matches!(b, b'$' | b'&') && is_ident_start(bytes.get(i + 1)))
}

fn handle_at(template: &str, start: usize) -> Result<Option<Handle<'_>>, VariableError> {
    let bytes = template.as_bytes();
    let sigil = match bytes[start] {
        b'$' => Sigil::Dollar,
        b'&' => Sigil::Ampersand,
        _ => return Ok(None),
    };

    let name_start = start + 1;
    if !is_ident_start(bytes.get(name_start)) {
        return Ok(None);
    }

    let mut name_end = name_start;
    while bytes
        .get(name_end)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
    {
        name_end += 1;
    }
    let name = &template[name_start..name_end];

    if bytes.get(name_end) != Some(&b'[') {
        return Ok(Some(Handle {
            sigil,
            name,
            args: Vec::new(),
            start,
            end: name_end,
        }));
    }

    let close = matching_bracket(bytes, name_end)
        .ok_or(VariableError::UnbalancedBrackets { position: start })?;

    Ok(Some(Handle {
        sigil,
        name,
        args: split_args(&template[name_end + 1..close]),
        start,
        end: close + 1,
    }))
}

fn is_ident_start(byte: Option<&u8>) -> bool {
    byte.is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_')
}

fn matching_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, b) in bytes[open..].iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an argument list on commas at bracket depth zero
pub fn split_args(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, b) in inner.bytes().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    args
}
