//! Statement splitter shared by the dialect parsers.
//!
//! Splits a text chunk into complete statements at top-level `;`, tracking
//! the constructs a cheap terminator check cannot see through: quoted
//! strings and identifiers, line and block comments, and dollar-quoted
//! function bodies. A chunk that ends inside one of these — or with a
//! trailing unterminated statement — yields [`ParseError::Incomplete`],
//! which is exactly what drives the assembler's absorb-one-more-line loop.

use std::fmt;

/// Why a chunk failed to split into complete statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The chunk ends inside the named construct, or with statement text
    /// after the last top-level terminator.
    Incomplete { construct: &'static str },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Incomplete { construct } => {
                write!(f, "chunk ends inside {construct}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Per-dialect lexing rules.
#[derive(Debug, Clone, Copy)]
pub struct LexRules {
    /// Backslash escapes inside plain single-quoted strings
    /// (MySQL yes; PostgreSQL only inside E'...' strings).
    pub backslash_in_strings: bool,
    /// Backtick-quoted identifiers (MySQL).
    pub backtick_idents: bool,
    /// `#` line comments (MySQL).
    pub hash_comments: bool,
    /// Dollar-quoted bodies `$tag$ ... $tag$` (PostgreSQL).
    pub dollar_quotes: bool,
    /// Block comments nest (PostgreSQL).
    pub nested_block_comments: bool,
}

impl LexRules {
    pub fn postgres() -> Self {
        Self {
            backslash_in_strings: false,
            backtick_idents: false,
            hash_comments: false,
            dollar_quotes: true,
            nested_block_comments: true,
        }
    }

    pub fn mysql() -> Self {
        Self {
            backslash_in_strings: true,
            backtick_idents: true,
            hash_comments: true,
            dollar_quotes: false,
            nested_block_comments: false,
        }
    }
}

/// Split `chunk` into statement texts (terminators stripped).
///
/// With `at_eof` set, a clean trailing fragment (the dump's last statement
/// missing its `;`) is accepted as a statement; mid-stream it is treated as
/// incomplete so the assembler keeps absorbing lines. Comment-only and
/// whitespace-only trailing text is always accepted and produces nothing.
pub fn split_statements(
    chunk: &str,
    rules: LexRules,
    at_eof: bool,
) -> Result<Vec<String>, ParseError> {
    let bytes = chunk.as_bytes();
    let mut stmts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    // Tracks whether anything other than whitespace/comments has been seen
    // since the last terminator.
    let mut has_content = false;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\'' => {
                let escape_prefixed = has_content
                    && i > 0
                    && matches!(bytes[i - 1], b'E' | b'e')
                    && is_escape_string_prefix(bytes, i);
                let backslashes = rules.backslash_in_strings || escape_prefixed;
                i = scan_quoted(bytes, i, b'\'', backslashes)
                    .ok_or(ParseError::Incomplete {
                        construct: "string literal",
                    })?;
                has_content = true;
            }
            b'"' => {
                // Quoted identifier: "" is the only escape.
                i = scan_quoted(bytes, i, b'"', false).ok_or(ParseError::Incomplete {
                    construct: "quoted identifier",
                })?;
                has_content = true;
            }
            b'`' if rules.backtick_idents => {
                i = scan_quoted(bytes, i, b'`', false).ok_or(ParseError::Incomplete {
                    construct: "quoted identifier",
                })?;
                has_content = true;
            }
            b'-' if i + 1 < bytes.len() && bytes[i + 1] == b'-' => {
                i = scan_line_comment(bytes, i);
            }
            b'#' if rules.hash_comments => {
                i = scan_line_comment(bytes, i);
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i = scan_block_comment(bytes, i, rules.nested_block_comments).ok_or(
                    ParseError::Incomplete {
                        construct: "block comment",
                    },
                )?;
            }
            b'$' if rules.dollar_quotes => {
                if let Some(tag_end) = dollar_tag_end(bytes, i) {
                    i = scan_dollar_quoted(chunk, i, tag_end).ok_or(ParseError::Incomplete {
                        construct: "dollar-quoted string",
                    })?;
                } else {
                    i += 1;
                }
                has_content = true;
            }
            b';' => {
                if has_content {
                    // Comment lines preceding the statement are part of the
                    // span but not of the statement text.
                    let text = strip_leading_trivia(chunk[start..i].trim(), rules);
                    stmts.push(text.trim_end().to_string());
                }
                i += 1;
                start = i;
                has_content = false;
            }
            _ => {
                if !b.is_ascii_whitespace() {
                    has_content = true;
                }
                i += 1;
            }
        }
    }

    if has_content {
        let tail = chunk[start..].trim();
        if strip_comments_and_ws(tail, rules) {
            // Trailing comments only; nothing to emit.
        } else if at_eof {
            stmts.push(strip_leading_trivia(tail, rules).trim_end().to_string());
        } else {
            return Err(ParseError::Incomplete {
                construct: "statement",
            });
        }
    }

    Ok(stmts)
}

/// Strip leading comments and whitespace from a statement's text.
/// Statement texts keep the comment lines that preceded them in the dump;
/// classification wants the first real keyword.
pub fn strip_leading_trivia(text: &str, rules: LexRules) -> &str {
    let bytes = text.as_bytes();
    let mut i = 0;
    loop {
        let j = i;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'-' && bytes[i + 1] == b'-' {
            i = scan_line_comment(bytes, i);
        } else if i < bytes.len() && bytes[i] == b'#' && rules.hash_comments {
            i = scan_line_comment(bytes, i);
        } else if i + 1 < bytes.len() && bytes[i] == b'/' && bytes[i + 1] == b'*' {
            match scan_block_comment(bytes, i, rules.nested_block_comments) {
                Some(next) => i = next,
                None => return &text[i..],
            }
        } else if i == j {
            return &text[i..];
        }
    }
}

/// True when the tail consists solely of comments and whitespace.
fn strip_comments_and_ws(tail: &str, rules: LexRules) -> bool {
    let bytes = tail.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
        } else if b == b'-' && i + 1 < bytes.len() && bytes[i + 1] == b'-' {
            i = scan_line_comment(bytes, i);
        } else if b == b'#' && rules.hash_comments {
            i = scan_line_comment(bytes, i);
        } else if b == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
            match scan_block_comment(bytes, i, rules.nested_block_comments) {
                Some(next) => i = next,
                None => return false,
            }
        } else {
            return false;
        }
    }
    true
}

/// The `E` of an `E'...'` string must itself start a token.
fn is_escape_string_prefix(bytes: &[u8], quote_pos: usize) -> bool {
    let e_pos = quote_pos - 1;
    if e_pos == 0 {
        return true;
    }
    let prev = bytes[e_pos - 1];
    !(prev.is_ascii_alphanumeric() || prev == b'_')
}

/// Scan a quoted region starting at `start` (the opening quote). Returns the
/// index after the closing quote. Doubling the quote always escapes it;
/// backslash escapes are honored when `backslashes` is set.
fn scan_quoted(bytes: &[u8], start: usize, quote: u8, backslashes: bool) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslashes && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if i + 1 < bytes.len() && bytes[i + 1] == quote {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Returns the index after the newline ending a line comment (or input end).
fn scan_line_comment(bytes: &[u8], start: usize) -> usize {
    match memchr::memchr(b'\n', &bytes[start..]) {
        Some(p) => start + p + 1,
        None => bytes.len(),
    }
}

/// Scan a `/* ... */` comment. Returns the index after the closing `*/`.
fn scan_block_comment(bytes: &[u8], start: usize, nested: bool) -> Option<usize> {
    let mut depth = 1;
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return Some(i);
            }
        } else if nested && bytes[i] == b'/' && bytes[i + 1] == b'*' {
            depth += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

/// If `start` begins a dollar-quote opener `$tag$`, return the index just
/// after the opener; otherwise None. Tags are empty or identifier-like and
/// must not start with a digit (so `$1` parameters stay plain text).
fn dollar_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'$' {
            return Some(i + 1);
        }
        let is_tag_char = b.is_ascii_alphanumeric() || b == b'_';
        if !is_tag_char || (i == start + 1 && b.is_ascii_digit()) {
            return None;
        }
        i += 1;
    }
    None
}

/// Scan from the opener `$tag$` to the matching closer. Returns the index
/// after the closing tag.
fn scan_dollar_quoted(chunk: &str, start: usize, tag_end: usize) -> Option<usize> {
    let tag = &chunk[start..tag_end];
    chunk[tag_end..].find(tag).map(|p| tag_end + p + tag.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg(chunk: &str) -> Result<Vec<String>, ParseError> {
        split_statements(chunk, LexRules::postgres(), false)
    }

    fn my(chunk: &str) -> Result<Vec<String>, ParseError> {
        split_statements(chunk, LexRules::mysql(), false)
    }

    #[test]
    fn test_simple_split() {
        let stmts = pg("SET a = 1;\nCREATE TABLE t (x int);\n").unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "SET a = 1");
    }

    #[test]
    fn test_semicolon_in_string() {
        let stmts = pg("INSERT INTO t VALUES ('a;b');").unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_unterminated_string_is_incomplete() {
        let err = pg("INSERT INTO t VALUES ('a;b").unwrap_err();
        assert_eq!(
            err,
            ParseError::Incomplete {
                construct: "string literal"
            }
        );
    }

    #[test]
    fn test_doubled_quote_escape() {
        let stmts = pg("INSERT INTO t VALUES ('it''s; fine');").unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_dollar_quoted_body_absorbs_semicolons() {
        // Function bodies are the classic reason a semicolon trigger lies.
        let sql = "CREATE FUNCTION f() RETURNS int AS $$\nBEGIN; RETURN 1; END;\n$$ LANGUAGE plpgsql;";
        let stmts = pg(sql).unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_open_dollar_quote_is_incomplete() {
        let err = pg("CREATE FUNCTION f() AS $body$ BEGIN;").unwrap_err();
        assert_eq!(
            err,
            ParseError::Incomplete {
                construct: "dollar-quoted string"
            }
        );
    }

    #[test]
    fn test_dollar_parameter_is_plain_text() {
        let stmts = pg("SELECT $1;").unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_semicolon_in_comment() {
        let stmts = pg("-- a;b\nSET x = 1;").unwrap();
        assert_eq!(stmts, vec!["SET x = 1"]);
    }

    #[test]
    fn test_open_block_comment_is_incomplete() {
        assert!(pg("/* a; b").is_err());
    }

    #[test]
    fn test_nested_block_comment_postgres() {
        let stmts = pg("/* outer /* inner; */ still; */ SET x = 1;").unwrap();
        assert_eq!(stmts, vec!["SET x = 1"]);
    }

    #[test]
    fn test_trailing_fragment_mid_stream_is_incomplete() {
        let err = pg("SET a = 1;\nCREATE TABLE t (").unwrap_err();
        assert_eq!(
            err,
            ParseError::Incomplete {
                construct: "statement"
            }
        );
    }

    #[test]
    fn test_trailing_fragment_accepted_at_eof() {
        let stmts = split_statements("SET a = 1;\nSET b = 2", LexRules::postgres(), true).unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_trailing_comments_ok_mid_stream() {
        let stmts = pg("SET a = 1;\n-- dump complete\n").unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_mysql_backslash_escape() {
        let stmts = my("INSERT INTO t VALUES ('it\\'s; ok');").unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_mysql_backtick_and_hash() {
        let stmts = my("# header; comment\nCREATE TABLE `a;b` (x int);").unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_escape_string_prefix() {
        let stmts = pg("INSERT INTO t VALUES (E'a\\';b');").unwrap();
        assert_eq!(stmts.len(), 1);
    }
}
