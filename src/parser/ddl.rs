//! DDL body parsing shared by the dialect parsers.
//!
//! CREATE TABLE bodies, column clauses, inline and table-level constraints,
//! and type expressions are close enough across the supported dialects that
//! one set of routines covers both; dialect differences live in the lexer
//! rules and in the statement-head handling of `postgres.rs` / `mysql.rs`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::*;
use super::{outer_paren_group, parse_name_list, read_ident, read_qualified, skip_ws};

/// Keyword prefix test with a word boundary: the keyword must be followed
/// by whitespace, `(` or end of text.
pub(super) fn kw_prefix(text: &str, kw: &str) -> bool {
    if !text.starts_with(kw) {
        return false;
    }
    match text.as_bytes().get(kw.len()) {
        None => true,
        Some(b) => b.is_ascii_whitespace() || *b == b'(',
    }
}

/// Table-level constraint clause, or None if the part is a column def.
pub(super) fn parse_table_constraint_clause(part: &str) -> Option<ConstraintClause> {
    let upper = part.to_uppercase();
    let upper = upper.trim_start();
    let (name, rest) = if kw_prefix(upper, "CONSTRAINT") {
        let (name, idx) = read_ident(part, part.to_uppercase().find("CONSTRAINT")? + 10)?;
        (Some(name), part[idx..].trim_start())
    } else {
        (None, part)
    };
    let upper_rest = rest.to_uppercase();
    let upper_rest = upper_rest.trim_start();

    if kw_prefix(upper_rest, "PRIMARY KEY") {
        let (cols, _) = outer_paren_group(rest)?;
        let mut c = ConstraintClause::new(ConstraintKind::PrimaryKey);
        c.name = name;
        c.columns = parse_name_list(cols);
        return Some(c);
    }
    if kw_prefix(upper_rest, "UNIQUE")
        || kw_prefix(upper_rest, "UNIQUE KEY")
        || kw_prefix(upper_rest, "UNIQUE INDEX")
    {
        let (cols, _) = outer_paren_group(rest)?;
        let mut c = ConstraintClause::new(ConstraintKind::Unique);
        // MySQL UNIQUE KEY carries the index name between the keywords and
        // the column list.
        c.name = name.or_else(|| unique_key_name(rest));
        c.columns = parse_name_list(cols);
        return Some(c);
    }
    if kw_prefix(upper_rest, "FOREIGN KEY") {
        let (cols, after) = outer_paren_group(rest)?;
        let mut c = ConstraintClause::new(ConstraintKind::ForeignKey);
        c.name = name;
        c.columns = parse_name_list(cols);
        parse_references(&rest[after..], &mut c);
        return Some(c);
    }
    if kw_prefix(upper_rest, "KEY") || kw_prefix(upper_rest, "INDEX") {
        // Non-unique inline index (MySQL); not part of the constraint model.
        let mut c = ConstraintClause::new(ConstraintKind::Other("Key".to_string()));
        c.name = name;
        return Some(c);
    }
    if kw_prefix(upper_rest, "CHECK") {
        let mut c = ConstraintClause::new(ConstraintKind::Other("Check".to_string()));
        c.name = name;
        return Some(c);
    }
    if kw_prefix(upper_rest, "EXCLUDE") {
        let mut c = ConstraintClause::new(ConstraintKind::Other("Exclude".to_string()));
        c.name = name;
        return Some(c);
    }
    if kw_prefix(upper_rest, "FULLTEXT") || kw_prefix(upper_rest, "SPATIAL") {
        let mut c = ConstraintClause::new(ConstraintKind::Other("FulltextKey".to_string()));
        c.name = name;
        return Some(c);
    }
    if kw_prefix(upper_rest, "LIKE") {
        return Some(ConstraintClause::new(ConstraintKind::Other(
            "Like".to_string(),
        )));
    }
    None
}

/// Index name of `UNIQUE KEY name (cols)` / `UNIQUE INDEX name (cols)`.
fn unique_key_name(rest: &str) -> Option<String> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)^UNIQUE\s+(?:KEY|INDEX)\s+([^(\s]+)").unwrap());
    let caps = RE.captures(rest.trim_start())?;
    read_ident(caps.get(1)?.as_str(), 0).map(|(name, _)| name)
}

/// Fill the referent side of a FOREIGN KEY from `REFERENCES tbl [(cols)]`.
pub(super) fn parse_references(rest: &str, c: &mut ConstraintClause) {
    static REFERENCES_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)\bREFERENCES\s+(.*)$").unwrap());
    if let Some(caps) = REFERENCES_RE.captures(rest) {
        let target = caps.get(1).unwrap().as_str();
        if let Some((name, idx)) = read_qualified(target, 0) {
            c.refer_table = Some(name);
            let tail = target[idx..].trim_start();
            if tail.starts_with('(') {
                if let Some((cols, _)) = outer_paren_group(tail) {
                    c.refer_columns = parse_name_list(cols);
                }
            }
        }
    }
}

/// Column clause: `name type [inline constraints]`.
pub(super) fn parse_column_clause(part: &str) -> Option<ColumnClause> {
    let (name, idx) = read_ident(part, 0)?;
    let rest = part[idx..].trim();
    if rest.is_empty() {
        return None;
    }
    let split = constraint_start(rest);
    let type_text = rest[..split].trim();
    let constraint_text = &rest[split..];
    let (type_name, type_mods, array_bounds) = parse_type(type_text)?;
    let constraints = parse_inline_constraints(constraint_text);
    Some(ColumnClause {
        name,
        type_name,
        type_mods,
        array_bounds,
        constraints,
    })
}

const CONSTRAINT_KEYWORDS: &[&str] = &[
    "NOT",
    "NULL",
    "DEFAULT",
    "PRIMARY",
    "UNIQUE",
    "REFERENCES",
    "CHECK",
    "CONSTRAINT",
    "GENERATED",
    "COLLATE",
    "AUTO_INCREMENT",
    "COMMENT",
];

/// Offset of the first inline-constraint keyword at paren depth zero;
/// everything before it is the type expression. `CHARACTER` only counts
/// when it starts a `CHARACTER SET` attribute, not a `character varying`
/// type.
fn constraint_start(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'\'' | b'"' | b'`' => {
                // Skip the quoted region wholesale (doubling escapes).
                let q = bytes[i];
                let mut j = i + 1;
                while j < bytes.len() {
                    if bytes[j] == q {
                        if j + 1 < bytes.len() && bytes[j + 1] == q {
                            j += 2;
                            continue;
                        }
                        break;
                    }
                    j += 1;
                }
                i = j + 1;
                continue;
            }
            _ => {}
        }
        if depth == 0 && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            let word_end = rest[i..]
                .find(|c: char| c.is_ascii_whitespace() || c == '(')
                .map(|p| i + p)
                .unwrap_or(rest.len());
            let word = rest[i..word_end].to_uppercase();
            if word == "CHARACTER" {
                let next = rest[word_end..].trim_start().to_uppercase();
                if next.starts_with("SET") {
                    return i;
                }
            } else if CONSTRAINT_KEYWORDS.contains(&word.as_str()) {
                return i;
            }
        }
        i += 1;
    }
    rest.len()
}

/// Parse a type expression into (canonical name, mods, array bounds).
pub(super) fn parse_type(text: &str) -> Option<(String, Vec<i64>, Vec<i64>)> {
    let mut text = text.trim();
    if text.is_empty() {
        return None;
    }

    // Trailing array bounds: [] or [n], possibly repeated.
    let mut array_bounds = Vec::new();
    while text.ends_with(']') {
        let open = text.rfind('[')?;
        let inner = text[open + 1..text.len() - 1].trim();
        let bound = if inner.is_empty() {
            -1
        } else {
            inner.parse::<i64>().ok()?
        };
        array_bounds.insert(0, bound);
        text = text[..open].trim_end();
    }

    // Parenthesized modifiers. Non-numeric entries (enum/set member lists)
    // are dropped; the base name carries the information that matters.
    let mut mods = Vec::new();
    let base = if let Some(open) = text.find('(') {
        let close = text.rfind(')')?;
        for m in text[open + 1..close].split(',') {
            if let Ok(v) = m.trim().parse::<i64>() {
                mods.push(v);
            }
        }
        format!("{} {}", &text[..open], &text[close + 1..])
    } else {
        text.to_string()
    };

    let collapsed = base.split_whitespace().collect::<Vec<_>>().join(" ");
    let name = canonical_type_name(&collapsed.to_lowercase());
    if name.is_empty() {
        return None;
    }
    Some((name, mods, array_bounds))
}

/// Dumps spell several types in long form; canonicalize to the short names
/// the target mapping keys on.
fn canonical_type_name(name: &str) -> String {
    match name {
        "character varying" => "varchar".to_string(),
        "character" => "char".to_string(),
        "timestamp with time zone" => "timestamptz".to_string(),
        "timestamp without time zone" => "timestamp".to_string(),
        "time with time zone" => "timetz".to_string(),
        "time without time zone" => "time".to_string(),
        "double precision" => "float8".to_string(),
        "bit varying" => "varbit".to_string(),
        other => other.to_string(),
    }
}

/// Inline constraints of one column. Their implicit target is the owning
/// column, so the clauses carry no column list.
fn parse_inline_constraints(text: &str) -> Vec<ConstraintClause> {
    let mut out = Vec::new();
    let mut pending_name: Option<String> = None;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        i = skip_ws(bytes, i);
        if i >= bytes.len() {
            break;
        }
        let word_end = text[i..]
            .find(|c: char| c.is_ascii_whitespace() || c == '(')
            .map(|p| i + p)
            .unwrap_or(text.len());
        let word = text[i..word_end].to_uppercase();
        match word.as_str() {
            "CONSTRAINT" => {
                if let Some((name, j)) = read_ident(text, word_end) {
                    pending_name = Some(name);
                    i = j;
                } else {
                    i = word_end;
                }
            }
            "NOT" => {
                let mut c = ConstraintClause::new(ConstraintKind::NotNull);
                c.name = pending_name.take();
                out.push(c);
                i = skip_keyword(text, word_end, "NULL");
            }
            "NULL" => {
                // Explicit nullability is the default; nothing to record.
                i = word_end;
            }
            "DEFAULT" => {
                let mut c = ConstraintClause::new(ConstraintKind::Default);
                c.name = pending_name.take();
                out.push(c);
                i = skip_expression(text, word_end);
            }
            "PRIMARY" => {
                let mut c = ConstraintClause::new(ConstraintKind::PrimaryKey);
                c.name = pending_name.take();
                out.push(c);
                i = skip_keyword(text, word_end, "KEY");
            }
            "UNIQUE" => {
                let mut c = ConstraintClause::new(ConstraintKind::Unique);
                c.name = pending_name.take();
                out.push(c);
                i = word_end;
            }
            "REFERENCES" => {
                let mut c = ConstraintClause::new(ConstraintKind::ForeignKey);
                c.name = pending_name.take();
                parse_references(&text[i..], &mut c);
                // REFERENCES consumes the rest of the clause (match actions
                // and the like); nothing else to extract afterwards.
                out.push(c);
                break;
            }
            "CHECK" => {
                let mut c = ConstraintClause::new(ConstraintKind::Other("Check".to_string()));
                c.name = pending_name.take();
                out.push(c);
                i = skip_expression(text, word_end);
            }
            "GENERATED" => {
                out.push(ConstraintClause::new(ConstraintKind::Other(
                    "Generated".to_string(),
                )));
                i = skip_expression(text, word_end);
            }
            "COLLATE" | "COMMENT" | "CHARACTER" => {
                // Attribute with one argument; irrelevant to the model.
                i = match read_ident(text, skip_keyword(text, word_end, "SET")) {
                    Some((_, j)) => j,
                    None => skip_expression(text, word_end),
                };
            }
            "AUTO_INCREMENT" => {
                // Generated values are not carried over; model as an
                // ignored default, like any other source-side default.
                let mut c = ConstraintClause::new(ConstraintKind::Default);
                c.name = pending_name.take();
                out.push(c);
                i = word_end;
            }
            _ => i = word_end.max(i + 1),
        }
    }
    out
}

/// Skip one expected keyword (case-insensitive) after `i`.
fn skip_keyword(text: &str, i: usize, kw: &str) -> usize {
    let bytes = text.as_bytes();
    let j = skip_ws(bytes, i);
    if text[j..].to_uppercase().starts_with(kw) {
        j + kw.len()
    } else {
        j
    }
}

/// Skip a value expression: a parenthesized group, a quoted string, or
/// tokens up to the next constraint keyword at depth zero.
fn skip_expression(text: &str, i: usize) -> usize {
    let bytes = text.as_bytes();
    let j = skip_ws(bytes, i);
    if j >= bytes.len() {
        return j;
    }
    if bytes[j] == b'(' {
        if let Some((_, after)) = outer_paren_group(&text[j..]) {
            return j + after;
        }
    }
    let rel = constraint_start(&text[j..]);
    if rel == 0 {
        // Expression text is itself a keyword-lookalike; move past one word.
        text[j..]
            .find(|c: char| c.is_ascii_whitespace())
            .map(|p| j + p)
            .unwrap_or(text.len())
    } else {
        j + rel
    }
}

/// Key list of CREATE INDEX: plain columns with optional ASC/DESC.
/// Expression keys are dropped.
pub(super) fn parse_index_keys(cols: &str) -> Vec<(String, bool)> {
    let mut keys = Vec::new();
    for part in super::split_top_level(cols, ',') {
        if part.contains('(') {
            continue;
        }
        if let Some((name, idx)) = read_ident(&part, 0) {
            let desc = part[idx..].to_uppercase().contains("DESC");
            keys.push((name, desc));
        }
    }
    keys
}
