//! Schema-only conversion: build and finalize the target schema, write the
//! schema artifacts and report. No rows are converted, but row volumes are
//! still tallied so the report shows what a data run would move.

use super::common;
use crate::migrator::schema_pass;
use crate::report;
use crate::session::Session;
use crate::sink::{DdlFileSession, TargetSession};
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
    let (reader, bar) = common::open_with_progress(&source, progress)?;
    let bytes = schema_pass(&mut conv, reader, dialect)?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    common::write_artifact(&out, &prefix, "schema.txt", &report::render_schema_summary(&conv))?;
    DdlFileSession::new(out.join(format!("{prefix}schema.ddl.txt")))
        .create_or_update(&conv.target_schema)?;
    Session::from_conv(&conv, &dialect.to_string())
        .save(out.join(format!("{prefix}session.json")))?;

    let migration_report = report::build_report(
        &conv,
        &input_name,
        &dialect.to_string(),
        "schema",
        Some(source.sha256()?),
        bytes,
        started.elapsed().as_secs_f64(),
    );
    common::write_artifact(&out, &prefix, "report.txt", &report::render_text(&migration_report))?;
    common::emit_report(&migration_report, json)?;
    Ok(())
}
