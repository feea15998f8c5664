//! Streaming statement parsing.
//!
//! The dump is consumed line by line; lines accumulate into a candidate
//! chunk which is handed to the active dialect parser whenever a cheap
//! trigger fires (a `;` on the line just read, or end of stream). The
//! trigger lies — terminators occur inside function bodies, comments and
//! string literals — so a failed parse is not an error: it bumps the
//! reparse counter and absorbs one more line. Only an unparsable residue at
//! end of stream is fatal.

pub mod ast;
mod ddl;
mod lexer;
mod mysql;
mod postgres;
mod values;

pub use lexer::{split_statements, strip_leading_trivia, LexRules, ParseError};
pub use mysql::MySqlParser;
pub use postgres::PostgresParser;

use crate::conv::Conv;
use crate::reader::Reader;
use ast::Statement;
use std::io::Read;
use std::str::FromStr;

/// Source dialect of the dump being migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    Postgres,
    MySql,
}

impl FromStr for SqlDialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" | "pgdump" => Ok(SqlDialect::Postgres),
            "mysql" | "mysqldump" => Ok(SqlDialect::MySql),
            other => anyhow::bail!("unknown dialect: {other} (expected postgres or mysql)"),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::Postgres => write!(f, "postgres"),
            SqlDialect::MySql => write!(f, "mysql"),
        }
    }
}

/// Confidence of dialect auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectConfidence {
    High,
    Medium,
    Low,
}

/// Guess the dialect from the head of a dump.
pub fn detect_dialect(head: &[u8]) -> (SqlDialect, DialectConfidence) {
    let text = String::from_utf8_lossy(head);
    if text.contains("PostgreSQL database dump") || text.contains("FROM stdin") {
        return (SqlDialect::Postgres, DialectConfidence::High);
    }
    if text.contains("MySQL dump") || text.contains("/*!40") {
        return (SqlDialect::MySql, DialectConfidence::High);
    }
    if text.contains("pg_catalog") || text.contains("SET search_path") {
        return (SqlDialect::Postgres, DialectConfidence::Medium);
    }
    if text.contains('`') || text.contains("ENGINE=") {
        return (SqlDialect::MySql, DialectConfidence::Medium);
    }
    (SqlDialect::Postgres, DialectConfidence::Low)
}

/// Per-dialect adapter turning a text chunk into abstract statements.
pub trait DialectParser {
    fn dialect(&self) -> SqlDialect;

    /// Parse a chunk into statements. `at_eof` relaxes the trailing
    /// terminator requirement for the dump's final statement.
    fn parse_statements(&self, chunk: &str, at_eof: bool) -> Result<Vec<Statement>, ParseError>;
}

pub fn parser_for(dialect: SqlDialect) -> Box<dyn DialectParser> {
    match dialect {
        SqlDialect::Postgres => Box::new(PostgresParser),
        SqlDialect::MySql => Box::new(MySqlParser),
    }
}

/// Accumulate lines into a chunk and parse it as a statement batch.
///
/// Returns the exact consumed byte span and the parsed statements. A clean
/// end of stream yields an empty span and no statements. The only error
/// (besides I/O) is an unparsable residue at end of stream, reported with
/// its line/offset context — this is the run's single fatal parse path.
pub fn read_and_parse_chunk<R: Read>(
    conv: &mut Conv,
    reader: &mut Reader<R>,
    parser: &dyn DialectParser,
) -> anyhow::Result<(Vec<u8>, Vec<Statement>)> {
    let start_line = reader.line_number;
    let mut lines: Vec<Vec<u8>> = Vec::new();
    loop {
        let line = reader.read_line()?;
        if !line.is_empty() {
            lines.push(line);
        }
        let trigger = reader.eof || lines.last().is_some_and(|l| l.contains(&b';'));
        if trigger {
            let chunk_bytes: Vec<u8> = lines.concat();
            let chunk = String::from_utf8_lossy(&chunk_bytes);
            match parser.parse_statements(&chunk, reader.eof) {
                Ok(stmts) => return Ok((chunk_bytes, stmts)),
                Err(e) => {
                    if reader.eof {
                        anyhow::bail!(
                            "error parsing last {} line(s) of input (lines {}-{}, ending at offset {}): {}",
                            lines.len(),
                            start_line + 1,
                            reader.line_number,
                            reader.offset,
                            e
                        );
                    }
                    // Likely a terminator inside a multi-line construct the
                    // trigger cannot see through; absorb another line.
                    conv.stats.reparsed += 1;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared low-level parsing helpers used by both dialect parsers.
// ---------------------------------------------------------------------------

/// Skip ASCII whitespace starting at `i`.
pub(crate) fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Read one identifier at `i`: bare, or quoted with `"` / backtick
/// (doubling escapes the quote). Returns the unquoted text and the index
/// after it.
pub(crate) fn read_ident(s: &str, i: usize) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    let i = skip_ws(bytes, i);
    if i >= bytes.len() {
        return None;
    }
    let quote = match bytes[i] {
        b'"' => Some(b'"'),
        b'`' => Some(b'`'),
        _ => None,
    };
    if let Some(q) = quote {
        let mut out = String::new();
        let mut j = i + 1;
        while j < bytes.len() {
            if bytes[j] == q {
                if j + 1 < bytes.len() && bytes[j + 1] == q {
                    out.push(q as char);
                    j += 2;
                    continue;
                }
                return Some((out, j + 1));
            }
            out.push(bytes[j] as char);
            j += 1;
        }
        None
    } else {
        let start = i;
        let mut j = i;
        while j < bytes.len()
            && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_' || bytes[j] == b'$')
        {
            j += 1;
        }
        if j == start {
            return None;
        }
        // Bare identifiers fold to lowercase, matching how dumps refer to
        // them elsewhere.
        Some((s[start..j].to_lowercase(), j))
    }
}

/// Read a dot-separated qualified name (up to three components).
pub(crate) fn read_qualified(s: &str, i: usize) -> Option<(ast::QualifiedName, usize)> {
    let mut parts: Vec<String> = Vec::new();
    let (first, mut j) = read_ident(s, i)?;
    parts.push(first);
    let bytes = s.as_bytes();
    while parts.len() < 3 {
        let k = skip_ws(bytes, j);
        if k < bytes.len() && bytes[k] == b'.' {
            let (next, nj) = read_ident(s, k + 1)?;
            parts.push(next);
            j = nj;
        } else {
            break;
        }
    }
    let name = match parts.len() {
        1 => ast::QualifiedName {
            catalog: String::new(),
            namespace: String::new(),
            relation: parts.remove(0),
        },
        2 => ast::QualifiedName {
            catalog: String::new(),
            namespace: parts.remove(0),
            relation: parts.remove(0),
        },
        _ => ast::QualifiedName {
            catalog: parts.remove(0),
            namespace: parts.remove(0),
            relation: parts.remove(0),
        },
    };
    Some((name, j))
}

/// Split `s` on `sep` at paren depth zero, outside quoted regions.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                if chars.peek() == Some(&q) {
                    current.push(chars.next().unwrap());
                } else {
                    quote = None;
                }
            } else if ch == '\\' && q == '\'' {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c == sep && depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Find the outermost parenthesized group, returning the text between the
/// parens and the index just after the closing paren.
pub(crate) fn outer_paren_group(s: &str) -> Option<(&str, usize)> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut start = None;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                if i + 1 < bytes.len() && bytes[i + 1] == q {
                    i += 2;
                    continue;
                }
                quote = None;
            } else if b == b'\\' && q == b'\'' {
                i += 1;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' => {
                if depth == 0 {
                    start = Some(i + 1);
                }
                depth += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(st) = start {
                        return Some((&s[st..i], i + 1));
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Parse a comma-separated identifier list, stripping quoting.
pub(crate) fn parse_name_list(s: &str) -> Vec<String> {
    split_top_level(s, ',')
        .iter()
        .filter_map(|part| read_ident(part, 0).map(|(name, _)| name))
        .collect()
}

/// Unquote a single-quoted SQL string body (without the outer quotes).
/// `backslash` enables C-style escapes (MySQL, and PostgreSQL E'' strings).
pub(crate) fn unquote_string(body: &str, backslash: bool) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch == '\'' {
            // Doubled quote inside the body.
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        if backslash && ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
            continue;
        }
        out.push(ch);
    }
    out
}

/// Camel-case tag for an unrecognized statement, derived from its leading
/// keyword(s): "CREATE SEQUENCE ..." → "CreateSequence".
pub(crate) fn unsupported_tag(text: &str) -> String {
    let mut words = text.split_whitespace();
    let first = match words.next() {
        Some(w) => w,
        None => return "Empty".to_string(),
    };
    let mut tag = camel(first);
    if matches!(
        first.to_uppercase().as_str(),
        "CREATE" | "ALTER" | "DROP" | "LOCK" | "UNLOCK"
    ) {
        if let Some(second) = words.next() {
            tag.push_str(&camel(second));
        }
    }
    tag
}

fn camel(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
