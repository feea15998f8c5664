//! Literal parsing for INSERT value lists.
//!
//! Values are reduced to raw text here; typed conversion happens later
//! against the resolved schema. An expression we cannot reduce (function
//! call, subselect) is dropped from its row — the shortfall surfaces as a
//! column-count mismatch when the row is converted, which is the bad-row
//! path, never a parse failure.

use super::{outer_paren_group, split_top_level, unquote_string};

/// A reduced VALUES literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueLit {
    Null,
    Text(String),
    /// Unreducible expression; dropped from the row.
    Skip,
}

/// Parse the text after the VALUES keyword into rows of raw values.
/// `backslash` selects C-style string escapes (MySQL).
pub fn parse_values_rows(text: &str, backslash: bool) -> Vec<Vec<Option<String>>> {
    let mut rows = Vec::new();
    for group in split_top_level(text, ',') {
        let group = group.trim();
        if !group.starts_with('(') {
            continue;
        }
        let inner = match outer_paren_group(group) {
            Some((inner, _)) => inner,
            None => continue,
        };
        let mut row = Vec::new();
        for item in split_top_level(inner, ',') {
            match parse_literal(&item, backslash) {
                ValueLit::Null => row.push(None),
                ValueLit::Text(s) => row.push(Some(s)),
                // Drop the value; the converter reports the short row.
                ValueLit::Skip => {}
            }
        }
        rows.push(row);
    }
    rows
}

/// Reduce a single literal to text.
pub fn parse_literal(text: &str, backslash: bool) -> ValueLit {
    let text = strip_cast(text.trim());
    if text.is_empty() {
        return ValueLit::Skip;
    }
    let upper = text.to_uppercase();
    if upper == "NULL" {
        return ValueLit::Null;
    }
    if upper == "TRUE" {
        return ValueLit::Text("true".to_string());
    }
    if upper == "FALSE" {
        return ValueLit::Text("false".to_string());
    }

    let bytes = text.as_bytes();
    if bytes[0] == b'\'' {
        return string_body(text, 0, backslash);
    }
    // E'...' escape-string syntax always uses backslash escapes.
    if bytes.len() > 1 && (bytes[0] == b'E' || bytes[0] == b'e') && bytes[1] == b'\'' {
        return string_body(text, 1, true);
    }
    if is_number(text) {
        return ValueLit::Text(text.to_string());
    }
    ValueLit::Skip
}

/// Strip a trailing `::type` cast (pg dumps attach them to some literals).
fn strip_cast(text: &str) -> &str {
    if let Some(pos) = text.rfind("::") {
        // Only strip when the suffix looks like a type name, so string
        // contents containing "::" are left alone.
        let suffix = &text[pos + 2..];
        let is_type = !suffix.is_empty()
            && suffix.chars().all(|c| {
                c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || "_()[]\"".contains(c)
            });
        let quotes_before = text[..pos].matches('\'').count();
        if is_type && quotes_before % 2 == 0 {
            return text[..pos].trim_end();
        }
    }
    text
}

fn string_body(text: &str, quote_at: usize, backslash: bool) -> ValueLit {
    let inner = &text[quote_at + 1..];
    match inner.rfind('\'') {
        Some(end) => ValueLit::Text(unquote_string(&inner[..end], backslash)),
        None => ValueLit::Skip,
    }
}

fn is_number(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    if matches!(chars.peek(), Some('+') | Some('-')) {
        chars.next();
    }
    let mut digits = 0;
    let mut dot = false;
    let mut exp = false;
    for c in chars {
        match c {
            '0'..='9' => digits += 1,
            '.' if !dot && !exp => dot = true,
            'e' | 'E' if digits > 0 && !exp => {
                exp = true;
                digits = 0;
                dot = true;
            }
            '+' | '-' if exp && digits == 0 => {}
            _ => return false,
        }
    }
    digits > 0
}
