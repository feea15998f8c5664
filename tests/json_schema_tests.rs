//! Verify that --json report output matches its generated JSON schema.

use dumplift::conv::Conv;
use dumplift::migrator::{data_pass, schema_pass};
use dumplift::parser::SqlDialect;
use dumplift::sink::NullSink;
use jsonschema::Validator;
use serde_json::Value;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn report_validator() -> Validator {
    let schema = dumplift::json_schema::get_schema("report").expect("report schema registered");
    let schema_json = serde_json::to_value(&schema).expect("schema serializes");
    Validator::new(&schema_json).expect("schema compiles")
}

fn validate(json: &Value) {
    let validator = report_validator();
    if let Err(error) = validator.validate(json) {
        panic!(
            "report JSON doesn't match schema:\n  - {error}\n\nOutput was:\n{}",
            serde_json::to_string_pretty(json).unwrap()
        );
    }
}

#[test]
fn test_in_process_report_matches_schema() {
    let dump = "CREATE TABLE t (a integer);\nINSERT INTO t (a) VALUES (1);\nINSERT INTO t (a) VALUES ('bad');\n";
    let mut conv = Conv::new();
    schema_pass(&mut conv, dump.as_bytes(), SqlDialect::Postgres).unwrap();
    let mut sink = NullSink::default();
    data_pass(&mut conv, dump.as_bytes(), SqlDialect::Postgres, &mut sink).unwrap();

    let report = dumplift::report::build_report(
        &conv,
        "test.sql",
        "postgres",
        "migrate",
        Some("deadbeef".to_string()),
        dump.len() as u64,
        0.25,
    );
    let json = serde_json::to_value(&report).unwrap();
    validate(&json);
}

#[test]
fn test_binary_json_output_matches_schema() {
    let mut dump = NamedTempFile::new().unwrap();
    dump.write_all(
        b"CREATE TABLE t (a integer, PRIMARY KEY (a));\nINSERT INTO t (a) VALUES (1);\n",
    )
    .unwrap();
    dump.flush().unwrap();

    let out_dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_dumplift"))
        .arg("migrate")
        .arg(dump.path())
        .arg("--dialect")
        .arg("postgres")
        .arg("--out")
        .arg(out_dir.path())
        .arg("--json")
        .output()
        .expect("binary runs");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "command failed: {stderr}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON output: {e}\n{stdout}"));
    validate(&json);

    // Artifacts land next to the prefix.
    let prefix = dump
        .path()
        .file_stem()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(out_dir.path().join(format!("{prefix}.report.txt")).exists());
    assert!(out_dir
        .path()
        .join(format!("{prefix}.schema.ddl.txt"))
        .exists());
    assert!(out_dir.path().join(format!("{prefix}.session.json")).exists());
    assert!(out_dir.path().join("data").join("t.sql").exists());
}

#[test]
fn test_schema_names_listed() {
    assert_eq!(dumplift::json_schema::schema_names(), vec!["report"]);
}
