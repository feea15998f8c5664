//! Data conversion tests: resilient row handling over full dumps.

use dumplift::conv::Conv;
use dumplift::data::Value;
use dumplift::migrator::{data_pass, schema_pass};
use dumplift::parser::SqlDialect;
use dumplift::sink::{CollectingSink, SqlFileSink};

fn convert(dump: &str) -> (Conv, CollectingSink) {
    let mut conv = Conv::new();
    schema_pass(&mut conv, dump.as_bytes(), SqlDialect::Postgres).unwrap();
    let mut sink = CollectingSink::default();
    data_pass(&mut conv, dump.as_bytes(), SqlDialect::Postgres, &mut sink).unwrap();
    (conv, sink)
}

#[test]
fn test_short_row_counted_never_fatal() {
    let dump = "\
CREATE TABLE t (a integer, b text);
COPY public.t (a, b) FROM stdin;
1\tok
2
3\talso ok
\\.
";
    let (conv, sink) = convert(dump);
    // All three lines tallied; only the short one is bad.
    assert_eq!(conv.stats.rows.get("t"), Some(&6)); // both passes tally
    assert_eq!(conv.stats.bad_rows.get("t"), Some(&1));
    assert_eq!(sink.rows.len(), 2);
    let sample = conv.sample_bad_rows(10);
    assert_eq!(sample.len(), 1);
    assert_eq!(sample[0].table, "t");
    assert_eq!(sample[0].vals, vec!["2"]);
}

#[test]
fn test_bad_value_in_insert_sampled() {
    let dump = "\
CREATE TABLE t (a integer);
INSERT INTO t (a) VALUES (1);
INSERT INTO t (a) VALUES ('not a number');
INSERT INTO t (a) VALUES (3);
";
    let (conv, sink) = convert(dump);
    assert_eq!(conv.stats.bad_rows.get("t"), Some(&1));
    assert_eq!(sink.rows.len(), 2);
    assert!(conv
        .sample_bad_rows(10)
        .iter()
        .any(|r| r.vals.contains(&"not a number".to_string())));
}

#[test]
fn test_insert_without_column_list_uses_schema_order() {
    let dump = "\
CREATE TABLE t (a integer, b text, PRIMARY KEY (a));
INSERT INTO t VALUES (7, 'seven');
";
    let (_, sink) = convert(dump);
    assert_eq!(sink.rows.len(), 1);
    let (table, cols, vals) = &sink.rows[0];
    assert_eq!(table, "t");
    assert_eq!(cols, &vec!["a".to_string(), "b".to_string()]);
    assert_eq!(vals[0], Value::Int64(7));
    assert_eq!(vals[1], Value::String("seven".to_string()));
}

#[test]
fn test_copy_values_convert_to_typed() {
    let dump = "\
CREATE TABLE m (ok boolean, n numeric(10,2), d date, ts timestamp with time zone, tags text[], PRIMARY KEY (n));
COPY public.m (ok, n, d, ts, tags) FROM stdin;
t\t12.50\t2021-06-01\t2021-06-01 10:00:00+02\t{a,b}
\\.
";
    let (conv, sink) = convert(dump);
    assert_eq!(conv.bad_rows(), 0);
    let vals = &sink.rows[0].2;
    assert_eq!(vals[0], Value::Bool(true));
    assert_eq!(vals[1], Value::Numeric("12.50".to_string()));
    assert!(matches!(vals[2], Value::Date(_)));
    assert!(matches!(vals[3], Value::Timestamp(_)));
    assert_eq!(
        vals[4],
        Value::Array(vec![
            Value::String("a".to_string()),
            Value::String("b".to_string())
        ])
    );
}

#[test]
fn test_timezone_setting_affects_zoneless_timestamps() {
    let dump = "\
SET timezone = '+05:00';
CREATE TABLE t (ts timestamp without time zone, PRIMARY KEY (ts));
INSERT INTO t (ts) VALUES ('2021-01-01 00:00:00');
";
    let (_, sink) = convert(dump);
    match &sink.rows[0].2[0] {
        Value::Timestamp(ts) => assert_eq!(ts.offset().local_minus_utc(), 5 * 3600),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_significant_whitespace_round_trips() {
    let dump = "\
CREATE TABLE t (a text, b text, PRIMARY KEY (a));
COPY public.t (a, b) FROM stdin;
a \t b
\\.
";
    let (_, sink) = convert(dump);
    let vals = &sink.rows[0].2;
    assert_eq!(vals[0], Value::String("a ".to_string()));
    assert_eq!(vals[1], Value::String(" b ".to_string()));
}

#[test]
fn test_sql_file_sink_renders_inserts() {
    let dump = "\
CREATE TABLE t (a integer, b text, PRIMARY KEY (a));
INSERT INTO t (a, b) VALUES (1, 'it''s');
";
    let mut conv = Conv::new();
    schema_pass(&mut conv, dump.as_bytes(), SqlDialect::Postgres).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut sink = SqlFileSink::new(dir.path()).unwrap();
    data_pass(&mut conv, dump.as_bytes(), SqlDialect::Postgres, &mut sink).unwrap();

    let written = std::fs::read_to_string(dir.path().join("t.sql")).unwrap();
    assert!(written.contains("INSERT INTO t (a, b) VALUES"));
    assert!(written.contains("(1, 'it''s')"));
}

#[test]
fn test_rows_for_unknown_tables_dropped_without_error() {
    let dump = "\
CREATE TABLE known (a integer, PRIMARY KEY (a));
INSERT INTO unknown (a) VALUES (1);
COPY public.also_unknown (a) FROM stdin;
1
\\.
INSERT INTO known (a) VALUES (2);
";
    let (conv, sink) = convert(dump);
    assert_eq!(sink.rows.len(), 1);
    assert_eq!(sink.rows[0].0, "known");
    // Unknown-table statements are skips, not errors.
    assert_eq!(conv.statement_errors(), 0);
    assert!(conv.stats.statements.get("Insert").unwrap().skip >= 1);
    assert!(conv.stats.statements.get("CopyFrom").unwrap().skip >= 1);
}
