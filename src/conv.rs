//! Shared conversion state.
//!
//! One `Conv` is created per migration run and threaded mutably through
//! parsing, schema assembly and data conversion; nothing else holds state.
//! It carries the mode, both schemas, the synthetic-key registry, all
//! counters, the bounded diagnostics log and the bounded bad-row sample.
//! It is read once at the end of the run to produce reports and is never
//! reset mid-run.

use crate::schema::{Column, Key, Schema, Type};
use crate::target;
use ahash::AHashMap;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Distinct diagnostics retained before further messages are folded into an
/// overflow counter.
pub const MAX_UNEXPECTED: usize = 1000;

/// Default capacity of the bad-row sample buffer.
pub const DEFAULT_BAD_ROW_SAMPLE: usize = 100;

/// Base name for synthesized primary-key columns.
pub const SYNTHETIC_KEY_BASE: &str = "synth_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Build schema only; data statements are tallied but produce no rows.
    #[default]
    Schema,
    /// Use the committed schema to convert and emit rows.
    Data,
}

/// Per-statement-kind tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementStat {
    pub schema: i64,
    pub data: i64,
    pub skip: i64,
    pub error: i64,
}

/// Counters accumulated over a run.
#[derive(Debug, Default)]
pub struct Stats {
    /// Rows seen per table (both modes; schema-only runs report expected
    /// volumes from this).
    pub rows: AHashMap<String, i64>,
    /// Rows that failed conversion, per table.
    pub bad_rows: AHashMap<String, i64>,
    /// Per-kind statement tallies.
    pub statements: AHashMap<String, StatementStat>,
    /// Diagnostics: message → occurrence count, capped at
    /// [`MAX_UNEXPECTED`] distinct messages.
    pub unexpected: AHashMap<String, i64>,
    /// Messages dropped after the distinct-message cap was reached.
    pub unexpected_overflow: i64,
    /// Chunk parses retried after a false terminator trigger.
    pub reparsed: i64,
}

/// One sampled bad row: enough to reproduce the failure offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadRow {
    pub table: String,
    pub cols: Vec<String>,
    pub vals: Vec<String>,
}

/// Capacity-bounded bad-row collector. Once full it stops accepting —
/// deterministic retention of the earliest failures.
#[derive(Debug, Default)]
struct BadRowSampler {
    rows: Vec<BadRow>,
    cap: usize,
}

impl BadRowSampler {
    fn add(&mut self, row: BadRow) {
        if self.rows.len() < self.cap {
            self.rows.push(row);
        }
    }
}

/// Synthetic primary key for a table that declared none: the generated
/// column name and the next sequence value to assign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticKey {
    pub col: String,
    pub sequence: i64,
}

impl SyntheticKey {
    /// Issue the next sequence value. Values are issued by the single Conv
    /// owner; concurrent writers would need this behind their own
    /// serialization point.
    pub fn next(&mut self) -> i64 {
        let v = self.sequence;
        self.sequence += 1;
        v
    }
}

/// Process-scoped conversion context.
pub struct Conv {
    mode: Mode,
    pub src_schema: Schema,
    pub target_schema: Schema,
    pub synthetic_keys: AHashMap<String, SyntheticKey>,
    pub stats: Stats,
    sampler: BadRowSampler,
    /// Zone applied to timestamps written without one.
    pub timezone: FixedOffset,
}

impl Default for Conv {
    fn default() -> Self {
        Self::new()
    }
}

impl Conv {
    pub fn new() -> Self {
        Self {
            mode: Mode::Schema,
            src_schema: Schema::new(),
            target_schema: Schema::new(),
            synthetic_keys: AHashMap::new(),
            stats: Stats::default(),
            sampler: BadRowSampler {
                rows: Vec::new(),
                cap: DEFAULT_BAD_ROW_SAMPLE,
            },
            timezone: FixedOffset::east_opt(0).unwrap(),
        }
    }

    /// Override the bad-row sample capacity (caller-supplied bound).
    pub fn with_sample_cap(mut self, cap: usize) -> Self {
        self.sampler.cap = cap;
        self
    }

    pub fn set_schema_mode(&mut self) {
        self.mode = Mode::Schema;
    }

    pub fn set_data_mode(&mut self) {
        self.mode = Mode::Data;
    }

    pub fn schema_mode(&self) -> bool {
        self.mode == Mode::Schema
    }

    pub fn data_mode(&self) -> bool {
        self.mode == Mode::Data
    }

    // -- statement accounting ------------------------------------------------

    pub fn schema_statement(&mut self, tag: &str) {
        self.stats.statements.entry(tag.to_string()).or_default().schema += 1;
    }

    pub fn data_statement(&mut self, tag: &str) {
        self.stats.statements.entry(tag.to_string()).or_default().data += 1;
    }

    pub fn skip_statement(&mut self, tag: &str) {
        self.stats.statements.entry(tag.to_string()).or_default().skip += 1;
    }

    pub fn error_in_statement(&mut self, tag: &str) {
        self.stats.statements.entry(tag.to_string()).or_default().error += 1;
    }

    /// Total statements seen across all kinds.
    pub fn statements(&self) -> i64 {
        self.stats
            .statements
            .values()
            .map(|s| s.schema + s.data + s.skip + s.error)
            .sum()
    }

    pub fn statement_errors(&self) -> i64 {
        self.stats.statements.values().map(|s| s.error).sum()
    }

    // -- diagnostics ---------------------------------------------------------

    /// Record a non-fatal anomaly. Repeats of the same message share one
    /// entry; new messages past the cap are folded into an overflow count.
    pub fn unexpected(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if let Some(count) = self.stats.unexpected.get_mut(&msg) {
            *count += 1;
        } else if self.stats.unexpected.len() < MAX_UNEXPECTED {
            self.stats.unexpected.insert(msg, 1);
        } else {
            self.stats.unexpected_overflow += 1;
        }
    }

    /// Total anomaly occurrences.
    pub fn unexpecteds(&self) -> i64 {
        self.stats.unexpected.values().sum::<i64>() + self.stats.unexpected_overflow
    }

    // -- row accounting ------------------------------------------------------

    pub fn stats_add_row(&mut self, table: &str) {
        *self.stats.rows.entry(table.to_string()).or_insert(0) += 1;
    }

    pub fn stats_add_bad_row(&mut self, table: &str) {
        *self.stats.bad_rows.entry(table.to_string()).or_insert(0) += 1;
    }

    pub fn rows(&self) -> i64 {
        self.stats.rows.values().sum()
    }

    pub fn bad_rows(&self) -> i64 {
        self.stats.bad_rows.values().sum()
    }

    /// Record a failed row in the bounded sample. Raw values are retained
    /// as written; NULLs render as "NULL".
    pub fn collect_bad_row(&mut self, table: &str, cols: &[String], vals: &[Option<String>]) {
        let vals = vals
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| "NULL".to_string()))
            .collect();
        self.sampler.add(BadRow {
            table: table.to_string(),
            cols: cols.to_vec(),
            vals,
        });
    }

    /// Up to `n` sampled bad rows.
    pub fn sample_bad_rows(&self, n: usize) -> &[BadRow] {
        &self.sampler.rows[..self.sampler.rows.len().min(n)]
    }

    // -- timezone ------------------------------------------------------------

    pub fn set_timezone(&mut self, tz: FixedOffset) {
        self.timezone = tz;
    }

    // -- synthetic keys ------------------------------------------------------

    /// Next sequence value for a table's synthetic key, if it has one.
    pub fn next_synthetic(&mut self, table: &str) -> Option<i64> {
        self.synthetic_keys.get_mut(table).map(|k| k.next())
    }

    /// Synthesize a primary key for every key-less table in the target
    /// schema. Runs once, after all schema statements are processed and
    /// before any data conversion.
    pub fn add_primary_keys(&mut self) {
        let names: Vec<String> = self.target_schema.names().to_vec();
        for name in names {
            let table = match self.target_schema.get_mut(&name) {
                Some(t) => t,
                None => continue,
            };
            if !table.primary_keys.is_empty() {
                continue;
            }
            let col = disambiguate(SYNTHETIC_KEY_BASE, |c| !table.has_column(c));
            let mut def = Column::new(&col, Type::new(target::INT64));
            def.not_null = true;
            table.push_column(def);
            table.primary_keys = vec![Key::asc(&col)];
            self.synthetic_keys.insert(
                name.clone(),
                SyntheticKey {
                    col,
                    sequence: 0,
                },
            );
        }
    }
}

/// First available name from `base`, `base0`, `base1`, ...
fn disambiguate(base: &str, available: impl Fn(&str) -> bool) -> String {
    if available(base) {
        return base.to_string();
    }
    let mut i = 0;
    loop {
        let candidate = format!("{base}{i}");
        if available(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

/// Parse a session time-zone value into a fixed offset.
///
/// Accepts UTC/GMT/Z and numeric offsets (`+02`, `-05:30`, `+01:00:00`).
/// Region names need a zone database the stack does not carry; callers log
/// those and keep the previous zone. `SYSTEM`/`LOCAL` also return None.
pub fn parse_timezone(value: &str) -> Option<FixedOffset> {
    let v = value.trim();
    match v.to_uppercase().as_str() {
        "UTC" | "GMT" | "Z" | "UCT" | "UNIVERSAL" => return FixedOffset::east_opt(0),
        "SYSTEM" | "LOCAL" | "LOCALTIME" | "DEFAULT" => return None,
        _ => {}
    }
    let bytes = v.as_bytes();
    if bytes.is_empty() || (bytes[0] != b'+' && bytes[0] != b'-') {
        return None;
    }
    let sign: i32 = if bytes[0] == b'-' { -1 } else { 1 };
    let mut parts = v[1..].split(':');
    let hours: i32 = parts.next()?.parse().ok()?;
    let minutes: i32 = parts.next().unwrap_or("0").parse().ok()?;
    let seconds: i32 = parts.next().unwrap_or("0").parse().ok()?;
    if hours > 18 || minutes > 59 || seconds > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60 + seconds))
}
