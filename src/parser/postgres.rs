//! PostgreSQL dump (pg_dump) statement parser.
//!
//! Classifies each statement of a chunk and extracts the pieces the schema
//! assembler and data converter act on. Everything unrecognized becomes
//! `Statement::Unsupported` with a kind tag — skipping is the dispatcher's
//! job, not ours.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::*;
use super::ddl::{parse_column_clause, parse_index_keys, parse_table_constraint_clause};
use super::values::parse_values_rows;
use super::{
    outer_paren_group, parse_name_list, read_ident, read_qualified, split_top_level,
    strip_leading_trivia, unquote_string, unsupported_tag, DialectParser, LexRules, ParseError,
    SqlDialect,
};

pub struct PostgresParser;

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^CREATE\s+(?:GLOBAL\s+|LOCAL\s+|UNLOGGED\s+|TEMPORARY\s+|TEMP\s+)*TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(.*)$")
        .unwrap()
});

static ALTER_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^ALTER\s+TABLE\s+(?:ONLY\s+)?(?:IF\s+EXISTS\s+)?(.*)$").unwrap()
});

static COPY_FROM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^COPY\s+(.*?)\s+FROM\s+stdin").unwrap());

static INSERT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^INSERT\s+INTO\s+(.*)$").unwrap());

static CREATE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^CREATE\s+(UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(.*)$")
        .unwrap()
});

static SET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^SET\s+(?:SESSION\s+|LOCAL\s+)?([a-z_."]+)\s*(?:=|\bTO\b)\s*(.*)$"#)
        .unwrap()
});

static INHERITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bINHERITS\s*\(").unwrap());

static VALUES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bVALUES\b").unwrap());

impl DialectParser for PostgresParser {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Postgres
    }

    fn parse_statements(&self, chunk: &str, at_eof: bool) -> Result<Vec<Statement>, ParseError> {
        let raw = super::split_statements(chunk, LexRules::postgres(), at_eof)?;
        Ok(raw.iter().map(|s| parse_statement(s)).collect())
    }
}

fn parse_statement(text: &str) -> Statement {
    let text = strip_leading_trivia(text, LexRules::postgres());
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
    if let Some(caps) = COPY_FROM_RE.captures(text) {
        return parse_copy_from(caps.get(1).unwrap().as_str());
    }
    if let Some(caps) = INSERT_RE.captures(text) {
        return parse_insert(caps.get(1).unwrap().as_str(), false);
    }
    if let Some(caps) = CREATE_INDEX_RE.captures(text) {
        return parse_create_index(caps.get(1).is_some(), caps.get(2).unwrap().as_str());
    }
    if let Some(caps) = SET_RE.captures(text) {
        return parse_set(caps.get(1).unwrap().as_str(), caps.get(2).unwrap().as_str());
    }
    Statement::Unsupported {
        tag: unsupported_tag(text),
    }
}

/// `rest` starts at the table name: `public.users (id integer, ...) ...`
pub(super) fn parse_create_table(rest: &str) -> Statement {
    let (name, idx) = match read_qualified(rest, 0) {
        Some(v) => v,
        None => {
            return Statement::CreateTable(CreateTable {
                name: QualifiedName::default(),
                columns: Vec::new(),
                constraints: Vec::new(),
                inherited: false,
            })
        }
    };
    let tail = &rest[idx..];
    let (body, after) = match outer_paren_group(tail) {
        Some(v) => v,
        // CREATE TABLE ... AS SELECT and partition clauses have no column
        // list; treat them as their own kind.
        None => {
            return Statement::Unsupported {
                tag: "CreateTableAs".to_string(),
            }
        }
    };
    let inherited = INHERITS_RE.is_match(&tail[after..]);

    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    for part in split_top_level(body, ',') {
        if let Some(clause) = parse_table_constraint_clause(&part) {
            constraints.push(clause);
        } else if let Some(col) = parse_column_clause(&part) {
            columns.push(col);
        }
    }
    Statement::CreateTable(CreateTable {
        name,
        columns,
        constraints,
        inherited,
    })
}

pub(super) fn parse_alter_table(rest: &str) -> Statement {
    let (name, idx) = match read_qualified(rest, 0) {
        Some(v) => v,
        None => {
            return Statement::AlterTable(AlterTable {
                name: QualifiedName::default(),
                cmds: Vec::new(),
            })
        }
    };
    let mut cmds = Vec::new();
    for part in split_top_level(&rest[idx..], ',') {
        cmds.push(parse_alter_cmd(&part));
    }
    Statement::AlterTable(AlterTable { name, cmds })
}

static SET_NOT_NULL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^ALTER\s+(?:COLUMN\s+)?(.*?)\s+SET\s+NOT\s+NULL$").unwrap());

static ADD_CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^ADD\s+(.*)$").unwrap());

fn parse_alter_cmd(part: &str) -> AlterCmd {
    if let Some(caps) = SET_NOT_NULL_RE.captures(part) {
        if let Some((column, _)) = read_ident(caps.get(1).unwrap().as_str(), 0) {
            return AlterCmd::SetNotNull { column };
        }
    }
    if let Some(caps) = ADD_CONSTRAINT_RE.captures(part) {
        let clause = caps.get(1).unwrap().as_str();
        if let Some(c) = parse_table_constraint_clause(clause) {
            return AlterCmd::AddConstraint(c);
        }
        return AlterCmd::Other {
            tag: format!("Add{}", unsupported_tag(clause)),
        };
    }
    AlterCmd::Other {
        tag: unsupported_tag(part),
    }
}

/// `rest` is everything between COPY and FROM: `public.users (a, b, c)`.
fn parse_copy_from(rest: &str) -> Statement {
    let (name, idx) = match read_qualified(rest, 0) {
        Some(v) => v,
        None => {
            return Statement::CopyFrom(CopyFrom {
                name: QualifiedName::default(),
                columns: Vec::new(),
            })
        }
    };
    let tail = rest[idx..].trim_start();
    let columns = if tail.starts_with('(') {
        outer_paren_group(tail)
            .map(|(cols, _)| parse_name_list(cols))
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    Statement::CopyFrom(CopyFrom { name, columns })
}

pub(super) fn parse_insert(rest: &str, backslash: bool) -> Statement {
    let (name, idx) = match read_qualified(rest, 0) {
        Some(v) => v,
        None => {
            return Statement::Insert(Insert {
                name: QualifiedName::default(),
                columns: Vec::new(),
                rows: Vec::new(),
            })
        }
    };
    let tail = &rest[idx..];
    let values_at = match VALUES_RE.find(tail) {
        Some(m) => m,
        None => {
            // INSERT ... SELECT and friends.
            return Statement::Unsupported {
                tag: "InsertSelect".to_string(),
            };
        }
    };
    let before = tail[..values_at.start()].trim();
    let columns = if before.starts_with('(') {
        outer_paren_group(before)
            .map(|(cols, _)| parse_name_list(cols))
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    let rows = parse_values_rows(&tail[values_at.end()..], backslash);
    Statement::Insert(Insert {
        name,
        columns,
        rows,
    })
}

pub(super) fn parse_create_index(unique: bool, rest: &str) -> Statement {
    static ON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)\bON\s+(.*)$").unwrap());
    static USING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^USING\s+\w+\s*").unwrap());

    let (index_name, idx) = match read_ident(rest, 0) {
        Some(v) => v,
        None => (String::new(), 0),
    };
    let caps = match ON_RE.captures(&rest[idx..]) {
        Some(c) => c,
        None => {
            return Statement::Unsupported {
                tag: "CreateIndex".to_string(),
            }
        }
    };
    let target = caps.get(1).unwrap().as_str();
    let (table, tidx) = match read_qualified(target, 0) {
        Some(v) => v,
        None => {
            return Statement::Unsupported {
                tag: "CreateIndex".to_string(),
            }
        }
    };
    let mut tail = target[tidx..].trim_start();
    if let Some(m) = USING_RE.find(tail) {
        tail = tail[m.end()..].trim_start();
    }
    let keys = outer_paren_group(tail)
        .map(|(cols, _)| parse_index_keys(cols))
        .unwrap_or_default();
    Statement::CreateIndex(CreateIndex {
        name: index_name,
        table,
        unique,
        keys,
    })
}

pub(super) fn parse_set(name: &str, value: &str) -> Statement {
    let value = value.trim();
    let value = if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
        unquote_string(&value[1..value.len() - 1], false)
    } else {
        value.to_string()
    };
    Statement::SetVariable(SetVariable {
        name: name.trim_matches('"').to_lowercase(),
        value,
    })
}
