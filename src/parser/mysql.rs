//! MySQL dump (mysqldump) statement parser.
//!
//! mysqldump output differs from pg_dump in lexing (backtick identifiers,
//! backslash string escapes, `#` comments, conditional `/*! ... */`
//! comments — which the lexer drops wholesale) and in how bulk data
//! arrives: there is no copy-block equivalent, rows come as multi-row
//! INSERTs. The DDL body grammar is close enough that the shared routines
//! in `ddl.rs` cover it.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::Statement;
use super::postgres::{
    parse_alter_table, parse_create_index, parse_create_table, parse_insert, parse_set,
};
use super::{
    strip_leading_trivia, unsupported_tag, DialectParser, LexRules, ParseError, SqlDialect,
};

pub struct MySqlParser;

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^CREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(.*)$").unwrap()
});

static ALTER_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^ALTER\s+TABLE\s+(.*)$").unwrap());

static INSERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^INSERT\s+(?:IGNORE\s+)?INTO\s+(.*)$").unwrap()
});

static CREATE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^CREATE\s+(UNIQUE\s+)?(?:FULLTEXT\s+|SPATIAL\s+)?INDEX\s+(.*)$").unwrap()
});

static SET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^SET\s+(?:SESSION\s+|GLOBAL\s+)?(@{0,2}[a-z_."]+)\s*=\s*(.*)$"#).unwrap()
});

impl DialectParser for MySqlParser {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::MySql
    }

    fn parse_statements(&self, chunk: &str, at_eof: bool) -> Result<Vec<Statement>, ParseError> {
        let raw = super::split_statements(chunk, LexRules::mysql(), at_eof)?;
        Ok(raw.iter().map(|s| parse_statement(s)).collect())
    }
}

fn parse_statement(text: &str) -> Statement {
    let text = strip_leading_trivia(text, LexRules::mysql());
    if text.is_empty() {
        return Statement::Unsupported {
            tag: "Empty".to_string(),
        };
    }
    if let Some(caps) = CREATE_TABLE_RE.captures(text) {
        return parse_create_table(caps.get(1).unwrap().as_str());
    }
    if let Some(caps) = ALTER_TABLE_RE.captures(text) {
        return parse_alter_table(caps.get(1).unwrap().as_str());
    }
    if let Some(caps) = INSERT_RE.captures(text) {
        return parse_insert(caps.get(1).unwrap().as_str(), true);
    }
    if let Some(caps) = CREATE_INDEX_RE.captures(text) {
        return parse_create_index(caps.get(1).is_some(), caps.get(2).unwrap().as_str());
    }
    if let Some(caps) = SET_RE.captures(text) {
        let name = caps.get(1).unwrap().as_str();
        if name.starts_with('@') {
            // Session user variables (@saved_cs_client and friends).
            return Statement::Unsupported {
                tag: "SetUserVariable".to_string(),
            };
        }
        return normalize_set(parse_set(name, caps.get(2).unwrap().as_str()));
    }
    Statement::Unsupported {
        tag: unsupported_tag(text),
    }
}

/// mysqldump calls the session zone `time_zone`; fold onto the shared name
/// so the dispatcher has one spelling to match.
fn normalize_set(stmt: Statement) -> Statement {
    match stmt {
        Statement::SetVariable(mut sv) => {
            if sv.name == "time_zone" {
                sv.name = "timezone".to_string();
            }
            Statement::SetVariable(sv)
        }
        other => other,
    }
}
