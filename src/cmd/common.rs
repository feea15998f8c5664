//! Shared plumbing for the subcommands: source and dialect resolution,
//! config merging, progress bars and artifact writing.

use crate::config::RunConfig;
use crate::conv::Conv;
use crate::input::{Compression, DumpSource};
use crate::parser::{detect_dialect, DialectConfidence, SqlDialect};
use crate::progress::ProgressReader;
use crate::report::MigrationReport;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Bytes of the dump head inspected for dialect detection.
const DETECT_HEAD_BYTES: usize = 16 * 1024;

/// Open the dump: a path, "-", or nothing (stdin).
pub fn resolve_source(file: &Option<PathBuf>) -> anyhow::Result<DumpSource> {
    match file {
        Some(path) if path.as_os_str() != "-" => {
            let source = DumpSource::from_file(path)?;
            if source.compression() != Compression::None {
                eprintln!("Detected compression: {}", source.compression());
            }
            Ok(source)
        }
        _ => DumpSource::from_stdin(),
    }
}

/// Dialect from the flag, or detected from the dump head.
pub fn resolve_dialect(
    flag: &Option<String>,
    source: &DumpSource,
) -> anyhow::Result<SqlDialect> {
    if let Some(name) = flag {
        return SqlDialect::from_str(name);
    }
    let head = source.head(DETECT_HEAD_BYTES)?;
    let (dialect, confidence) = detect_dialect(&head);
    let confidence_str = match confidence {
        DialectConfidence::High => "high confidence",
        DialectConfidence::Medium => "medium confidence",
        DialectConfidence::Low => "low confidence, defaulting",
    };
    eprintln!("Detected dialect: {dialect} ({confidence_str})");
    Ok(dialect)
}

/// Merge config-file settings into CLI defaults and apply the sampler cap
/// and timezone override to a fresh Conv.
pub fn build_conv(bad_row_samples: usize, config: &RunConfig) -> anyhow::Result<Conv> {
    let cap = config.bad_row_samples.unwrap_or(bad_row_samples);
    let mut conv = Conv::new().with_sample_cap(cap);
    if let Some(tz) = &config.timezone {
        match crate::conv::parse_timezone(tz) {
            Some(offset) => conv.set_timezone(offset),
            None => anyhow::bail!("unrecognized timezone in config: {tz}"),
        }
    }
    Ok(conv)
}

pub fn load_config(path: &Option<PathBuf>) -> anyhow::Result<RunConfig> {
    match path {
        Some(p) => RunConfig::load(p),
        None => Ok(RunConfig::default()),
    }
}

/// Default artifact prefix: dump file stem + ".", or "dump." for stdin.
pub fn resolve_prefix(file: &Option<PathBuf>, prefix: &Option<String>) -> String {
    if let Some(p) = prefix {
        return p.clone();
    }
    file.as_ref()
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .map(|s| format!("{}.", s.trim_end_matches(".sql")))
        .unwrap_or_else(|| "dump.".to_string())
}

/// Reader over the dump with an optional progress bar attached.
pub fn open_with_progress(
    source: &DumpSource,
    progress: bool,
) -> anyhow::Result<(Box<dyn Read>, Option<ProgressBar>)> {
    let reader = source.open()?;
    if !progress {
        return Ok((reader, None));
    }
    let bar = if source.compression() == Compression::None {
        let pb = ProgressBar::new(source.raw_len()?);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
        );
        pb
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bytes} read",
        )?);
        pb
    };
    let pb_clone = bar.clone();
    let reader = ProgressReader::new(reader, move |n| pb_clone.set_position(n));
    Ok((Box::new(reader), Some(bar)))
}

/// Write an artifact file under the output directory.
pub fn write_artifact(out: &Path, prefix: &str, name: &str, content: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out)?;
    let path = out.join(format!("{prefix}{name}"));
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Print the report: JSON to stdout with --json, text otherwise.
pub fn emit_report(report: &MigrationReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", crate::report::render_text(report));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefix() {
        assert_eq!(
            resolve_prefix(&Some(PathBuf::from("dumps/app.sql")), &None),
            "app."
        );
        assert_eq!(
            resolve_prefix(&None, &Some("custom.".to_string())),
            "custom."
        );
        assert_eq!(resolve_prefix(&None, &None), "dump.");
    }
}
