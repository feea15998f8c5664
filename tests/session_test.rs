//! Session snapshot tests: a schema run's decisions drive a later
//! data-only run.

use dumplift::conv::Conv;
use dumplift::migrator::{data_pass, schema_pass};
use dumplift::parser::SqlDialect;
use dumplift::session::Session;
use dumplift::sink::CollectingSink;

const DUMP: &str = "\
SET timezone = '+02:00';
CREATE TABLE t (a integer, b text);
INSERT INTO t (a, b) VALUES (1, 'x');
INSERT INTO t (a, b) VALUES (2, 'y');
";

#[test]
fn test_data_run_from_session_matches_direct_run() {
    // Direct: schema + data in one process.
    let mut direct = Conv::new();
    schema_pass(&mut direct, DUMP.as_bytes(), SqlDialect::Postgres).unwrap();
    let mut direct_sink = CollectingSink::default();
    data_pass(
        &mut direct,
        DUMP.as_bytes(),
        SqlDialect::Postgres,
        &mut direct_sink,
    )
    .unwrap();

    // Resumed: snapshot after schema, new Conv for data.
    let mut schema_only = Conv::new();
    schema_pass(&mut schema_only, DUMP.as_bytes(), SqlDialect::Postgres).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    Session::from_conv(&schema_only, "postgres").save(&path).unwrap();

    let mut resumed = Conv::new();
    Session::load(&path).unwrap().apply(&mut resumed).unwrap();
    let mut resumed_sink = CollectingSink::default();
    data_pass(
        &mut resumed,
        DUMP.as_bytes(),
        SqlDialect::Postgres,
        &mut resumed_sink,
    )
    .unwrap();

    assert_eq!(direct_sink.rows, resumed_sink.rows);
    assert_eq!(resumed.timezone.local_minus_utc(), 2 * 3600);
}

#[test]
fn test_session_preserves_synthetic_registry() {
    let mut conv = Conv::new();
    schema_pass(&mut conv, DUMP.as_bytes(), SqlDialect::Postgres).unwrap();
    let session = Session::from_conv(&conv, "postgres");
    assert_eq!(session.synthetic_keys.get("t").unwrap().col, "synth_id");
    assert_eq!(session.synthetic_keys.get("t").unwrap().sequence, 0);
    assert_eq!(session.dialect, "postgres");
}
