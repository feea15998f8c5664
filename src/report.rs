//! Report rendering from Conv's final state.
//!
//! Produces the migration report (text and JSON), the human-readable
//! schema summary and the rejected-rows dump. The JSON types carry
//! schemars derives so `--json` output is schema-checked in tests and can
//! be consumed by tooling.

use crate::conv::Conv;
use crate::target;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// JSON migration report.
#[derive(Debug, Serialize, JsonSchema)]
pub struct MigrationReport {
    pub input_file: String,
    pub dialect: String,
    /// "schema", "data" or "migrate".
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_sha256: Option<String>,
    pub bytes_read: u64,
    pub statements: StatementSummary,
    pub tables: Vec<TableReport>,
    pub rows: i64,
    pub bad_rows: i64,
    /// Diagnostics: message → occurrence count.
    pub unexpected: BTreeMap<String, i64>,
    pub unexpected_dropped: i64,
    pub elapsed_secs: f64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct StatementSummary {
    pub total: i64,
    pub schema: i64,
    pub data: i64,
    pub skipped: i64,
    pub errors: i64,
    pub reparsed: i64,
    /// Per-kind breakdown: tag → (schema, data, skip, error).
    pub by_kind: BTreeMap<String, KindCounts>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct KindCounts {
    pub schema: i64,
    pub data: i64,
    pub skip: i64,
    pub error: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TableReport {
    pub name: String,
    pub target_name: String,
    pub columns: usize,
    pub rows: i64,
    pub bad_rows: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthetic_key: Option<String>,
}

/// Assemble the report from Conv's final state.
pub fn build_report(
    conv: &Conv,
    input_file: &str,
    dialect: &str,
    mode: &str,
    dump_sha256: Option<String>,
    bytes_read: u64,
    elapsed_secs: f64,
) -> MigrationReport {
    let mut by_kind = BTreeMap::new();
    let (mut schema, mut data, mut skipped, mut errors) = (0, 0, 0, 0);
    for (tag, stat) in &conv.stats.statements {
        schema += stat.schema;
        data += stat.data;
        skipped += stat.skip;
        errors += stat.error;
        by_kind.insert(
            tag.clone(),
            KindCounts {
                schema: stat.schema,
                data: stat.data,
                skip: stat.skip,
                error: stat.error,
            },
        );
    }

    let tables = conv
        .target_schema
        .iter()
        .map(|t| TableReport {
            name: t.name.clone(),
            target_name: target::sanitize_name(&t.name),
            columns: t.col_names.len(),
            rows: conv.stats.rows.get(&t.name).copied().unwrap_or(0),
            bad_rows: conv.stats.bad_rows.get(&t.name).copied().unwrap_or(0),
            synthetic_key: conv.synthetic_keys.get(&t.name).map(|k| k.col.clone()),
        })
        .collect();

    MigrationReport {
        input_file: input_file.to_string(),
        dialect: dialect.to_string(),
        mode: mode.to_string(),
        dump_sha256,
        bytes_read,
        statements: StatementSummary {
            total: conv.statements(),
            schema,
            data,
            skipped,
            errors,
            reparsed: conv.stats.reparsed,
            by_kind,
        },
        tables,
        rows: conv.rows(),
        bad_rows: conv.bad_rows(),
        unexpected: conv
            .stats
            .unexpected
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect(),
        unexpected_dropped: conv.stats.unexpected_overflow,
        elapsed_secs,
    }
}

/// Human-readable report text.
pub fn render_text(report: &MigrationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Migration report for {} ({} dump, {} mode)\n",
        report.input_file, report.dialect, report.mode
    ));
    if let Some(sha) = &report.dump_sha256 {
        out.push_str(&format!("Dump sha256: {sha}\n"));
    }
    out.push_str(&format!(
        "Read {} bytes in {:.1}s\n\n",
        report.bytes_read, report.elapsed_secs
    ));

    let s = &report.statements;
    out.push_str(&format!(
        "Statements: {} total ({} schema, {} data, {} skipped, {} errors; {} chunk reparses)\n",
        s.total, s.schema, s.data, s.skipped, s.errors, s.reparsed
    ));
    for (tag, c) in &s.by_kind {
        out.push_str(&format!(
            "    {tag}: schema={} data={} skip={} error={}\n",
            c.schema, c.data, c.skip, c.error
        ));
    }

    out.push_str(&format!(
        "\nRows: {} total, {} bad\n",
        report.rows, report.bad_rows
    ));
    for t in &report.tables {
        let synth = t
            .synthetic_key
            .as_ref()
            .map(|c| format!(" (synthetic key {c})"))
            .unwrap_or_default();
        out.push_str(&format!(
            "    {}: {} cols, {} rows, {} bad{}\n",
            t.name, t.columns, t.rows, t.bad_rows, synth
        ));
    }

    if !report.unexpected.is_empty() {
        out.push_str("\nUnexpected conditions:\n");
        for (msg, count) in &report.unexpected {
            out.push_str(&format!("    {count}x {msg}\n"));
        }
        if report.unexpected_dropped > 0 {
            out.push_str(&format!(
                "    ... ({} additional messages dropped)\n",
                report.unexpected_dropped
            ));
        }
    }
    out
}

/// Human-readable summary of the resolved schemas: source type → target
/// type per column, keys and indexes.
pub fn render_schema_summary(conv: &Conv) -> String {
    let mut out = String::new();
    for table in conv.target_schema.iter() {
        let src = conv.src_schema.get(&table.name);
        out.push_str(&format!("Table {}:\n", table.name));
        for col_name in &table.col_names {
            let col = match table.get_column(col_name) {
                Some(c) => c,
                None => continue,
            };
            let src_ty = src
                .and_then(|t| t.get_column(col_name))
                .map(|c| c.ty.to_string())
                .unwrap_or_else(|| "-".to_string());
            let null = if col.not_null { " NOT NULL" } else { "" };
            out.push_str(&format!(
                "    {col_name}: {} -> {}{null}\n",
                src_ty,
                target::render_type(&col.ty)
            ));
        }
        if !table.primary_keys.is_empty() {
            let keys: Vec<&str> = table.primary_keys.iter().map(|k| k.column.as_str()).collect();
            out.push_str(&format!("    PRIMARY KEY ({})\n", keys.join(", ")));
        }
        for fk in &table.foreign_keys {
            out.push_str(&format!(
                "    FOREIGN KEY ({}) REFERENCES {} ({})\n",
                fk.columns.join(", "),
                fk.refer_table,
                fk.refer_columns.join(", ")
            ));
        }
        for idx in &table.indexes {
            let unique = if idx.unique { "UNIQUE " } else { "" };
            let keys: Vec<&str> = idx.keys.iter().map(|k| k.column.as_str()).collect();
            out.push_str(&format!(
                "    {}INDEX {} ({})\n",
                unique,
                idx.name,
                keys.join(", ")
            ));
        }
        out.push('\n');
    }
    out
}

/// Rejected-rows dump for offline inspection.
pub fn render_bad_rows(conv: &Conv, limit: usize) -> String {
    let samples = conv.sample_bad_rows(limit);
    if samples.is_empty() {
        return String::new();
    }
    let mut out = String::from("Rejected rows (sampled):\n");
    for row in samples {
        out.push_str(&format!(
            "table={} cols=[{}] vals=[{}]\n",
            row.table,
            row.cols.join(", "),
            row.vals.join(", ")
        ));
    }
    let total = conv.bad_rows();
    if total > samples.len() as i64 {
        out.push_str(&format!(
            "... sample truncated; {total} bad rows in total\n"
        ));
    }
    out
}
