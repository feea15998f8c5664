//! Row sinks and the target-store session boundary.
//!
//! The converter does not dictate transport: it hands each converted row to
//! a `RowSink`. The bundled sinks write rendered INSERT batches to
//! per-table files, collect rows in memory, or discard them (dry runs).
//! `TargetSession` is the schema-commitment boundary — it must complete
//! before any row is dispatched to a sink.

use crate::data::Value;
use crate::schema::Schema;
use crate::target;
use ahash::AHashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const WRITER_BUFFER_SIZE: usize = 256 * 1024;

/// Rows batched into one INSERT statement (keeps statements reviewable and
/// transaction-sized).
pub const MAX_ROWS_PER_INSERT: usize = 100;

/// Accepts converted rows for a named table.
pub trait RowSink {
    fn write_row(&mut self, table: &str, cols: &[String], values: &[Value]) -> anyhow::Result<()>;

    /// Flush any buffered state. Called once after the last row.
    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Applies the finalized target schema to the target store before any data
/// is written.
pub trait TargetSession {
    fn create_or_update(&mut self, schema: &Schema) -> anyhow::Result<()>;
}

/// Discards rows; keeps a count. Used by dry runs.
#[derive(Debug, Default)]
pub struct NullSink {
    pub rows_written: u64,
}

impl RowSink for NullSink {
    fn write_row(&mut self, _table: &str, _cols: &[String], _values: &[Value]) -> anyhow::Result<()> {
        self.rows_written += 1;
        Ok(())
    }
}

/// Buffers rows in memory. Used by tests and small verification runs.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub rows: Vec<(String, Vec<String>, Vec<Value>)>,
}

impl RowSink for CollectingSink {
    fn write_row(&mut self, table: &str, cols: &[String], values: &[Value]) -> anyhow::Result<()> {
        self.rows
            .push((table.to_string(), cols.to_vec(), values.to_vec()));
        Ok(())
    }
}

/// Table-filtering decorator: rows for excluded tables are dropped before
/// they reach the inner sink. Schema conversion is unaffected.
pub struct FilterSink<S: RowSink> {
    inner: S,
    include: Option<ahash::AHashSet<String>>,
    exclude: ahash::AHashSet<String>,
}

impl<S: RowSink> FilterSink<S> {
    pub fn new(inner: S, include: Option<Vec<String>>, exclude: Vec<String>) -> Self {
        Self {
            inner,
            include: include.map(|t| t.into_iter().collect()),
            exclude: exclude.into_iter().collect(),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RowSink> RowSink for FilterSink<S> {
    fn write_row(&mut self, table: &str, cols: &[String], values: &[Value]) -> anyhow::Result<()> {
        if self.exclude.contains(table) {
            return Ok(());
        }
        if let Some(include) = &self.include {
            if !include.contains(table) {
                return Ok(());
            }
        }
        self.inner.write_row(table, cols, values)
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.inner.flush()
    }
}

struct TableFile {
    writer: BufWriter<File>,
    /// Column list of the pending batch; a change forces a flush.
    cols: Vec<String>,
    pending: Vec<String>,
}

/// Writes rendered INSERT batches into one `.sql` file per table.
pub struct SqlFileSink {
    output_dir: PathBuf,
    files: AHashMap<String, TableFile>,
}

impl SqlFileSink {
    pub fn new(output_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        fs::create_dir_all(output_dir.as_ref())?;
        Ok(Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            files: AHashMap::new(),
        })
    }

    fn file_for(&mut self, table: &str) -> anyhow::Result<&mut TableFile> {
        use std::collections::hash_map::Entry;
        match self.files.entry(table.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let filename = self
                    .output_dir
                    .join(format!("{}.sql", target::sanitize_name(table)));
                let file = File::create(&filename)?;
                Ok(entry.insert(TableFile {
                    writer: BufWriter::with_capacity(WRITER_BUFFER_SIZE, file),
                    cols: Vec::new(),
                    pending: Vec::new(),
                }))
            }
        }
    }

    fn flush_table(table: &str, tf: &mut TableFile) -> anyhow::Result<()> {
        if tf.pending.is_empty() {
            return Ok(());
        }
        let cols: Vec<String> = tf.cols.iter().map(|c| target::sanitize_name(c)).collect();
        write!(
            tf.writer,
            "INSERT INTO {} ({}) VALUES\n{};\n",
            target::sanitize_name(table),
            cols.join(", "),
            tf.pending.join(",\n")
        )?;
        tf.pending.clear();
        Ok(())
    }
}

impl RowSink for SqlFileSink {
    fn write_row(&mut self, table: &str, cols: &[String], values: &[Value]) -> anyhow::Result<()> {
        let tf = self.file_for(table)?;
        if tf.cols != cols && !tf.pending.is_empty() {
            Self::flush_table(table, tf)?;
        }
        if tf.cols != cols {
            tf.cols = cols.to_vec();
        }
        let rendered: Vec<String> = values.iter().map(|v| v.to_sql_literal()).collect();
        tf.pending.push(format!("({})", rendered.join(", ")));
        if tf.pending.len() >= MAX_ROWS_PER_INSERT {
            Self::flush_table(table, tf)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        for (table, tf) in self.files.iter_mut() {
            Self::flush_table(table, tf)?;
            tf.writer.flush()?;
        }
        Ok(())
    }
}

/// Session that "commits" the schema by writing target DDL to a file.
/// A real store client implements `TargetSession` over its admin API.
pub struct DdlFileSession {
    path: PathBuf,
}

impl DdlFileSession {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TargetSession for DdlFileSession {
    fn create_or_update(&mut self, schema: &Schema) -> anyhow::Result<()> {
        fs::write(&self.path, target::render_ddl(schema))?;
        Ok(())
    }
}
