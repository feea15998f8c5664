//! Full migration: schema pass, schema commitment, then the data pass.
//!
//! Schema commitment (the DDL session) completes before any row reaches
//! the sink — that ordering is a hard barrier, not a convention.

use super::common;
use crate::migrator::{data_pass, schema_pass};
use crate::report;
use crate::session::Session;
use crate::sink::{DdlFileSession, FilterSink, NullSink, RowSink, SqlFileSink, TargetSession};
use std::path::PathBuf;
use std::time::Instant;

#[allow(clippy::too_many_arguments)]
pub fn run(
    file: Option<PathBuf>,
    dialect: Option<String>,
    out: PathBuf,
    prefix: Option<String>,
    bad_row_samples: usize,
    config: Option<PathBuf>,
    progress: bool,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let config = common::load_config(&config)?;
    let source = common::resolve_source(&file)?;
    let dialect = common::resolve_dialect(&dialect, &source)?;
    let prefix = common::resolve_prefix(&file, &prefix);
    let input_name = file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());

    let mut conv = common::build_conv(bad_row_samples, &config)?;

    // Pass 1: schema.
    let (reader, bar) = common::open_with_progress(&source, progress)?;
    schema_pass(&mut conv, reader, dialect)?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    common::write_artifact(&out, &prefix, "schema.txt", &report::render_schema_summary(&conv))?;
    Session::from_conv(&conv, &dialect.to_string())
        .save(out.join(format!("{prefix}session.json")))?;

    // Commit the target schema before any data is written.
    DdlFileSession::new(out.join(format!("{prefix}schema.ddl.txt")))
        .create_or_update(&conv.target_schema)?;

    // Pass 2: data.
    let mut sink: Box<dyn RowSink> = if dry_run {
        Box::new(NullSink::default())
    } else {
        Box::new(FilterSink::new(
            SqlFileSink::new(out.join("data"))?,
            config.tables.clone(),
            config.exclude.clone().unwrap_or_default(),
        ))
    };
    let (reader, bar) = common::open_with_progress(&source, progress)?;
    let bytes = data_pass(&mut conv, reader, dialect, sink.as_mut())?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let migration_report = report::build_report(
        &conv,
        &input_name,
        &dialect.to_string(),
        "migrate",
        Some(source.sha256()?),
        bytes,
        started.elapsed().as_secs_f64(),
    );
    common::write_artifact(&out, &prefix, "report.txt", &report::render_text(&migration_report))?;
    let bad = report::render_bad_rows(&conv, bad_row_samples);
    if !bad.is_empty() {
        common::write_artifact(&out, &prefix, "dropped.txt", &bad)?;
    }
    common::emit_report(&migration_report, json)?;
    Ok(())
}
