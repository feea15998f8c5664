//! End-to-end schema processing tests over realistic dump text.

use dumplift::conv::Conv;
use dumplift::migrator::{data_pass, schema_pass};
use dumplift::parser::{parser_for, read_and_parse_chunk, SqlDialect};
use dumplift::reader::Reader;
use dumplift::schema::Key;
use dumplift::sink::CollectingSink;

const PG_DUMP: &str = "\
--
-- PostgreSQL database dump
--

SET statement_timeout = 0;
SET timezone = 'UTC';

CREATE TABLE public.companies (
    id integer NOT NULL,
    name character varying(80) NOT NULL
);

CREATE SEQUENCE public.companies_id_seq
    START WITH 1
    INCREMENT BY 1;

CREATE TABLE public.users (
    id integer NOT NULL,
    company_id integer,
    email text,
    active boolean DEFAULT true,
    joined timestamp with time zone
);

CREATE TABLE public.audit_log (
    at timestamp without time zone,
    entry text
);

ALTER TABLE ONLY public.companies
    ADD CONSTRAINT companies_pkey PRIMARY KEY (id);

ALTER TABLE ONLY public.users
    ADD CONSTRAINT users_pkey PRIMARY KEY (id);

ALTER TABLE ONLY public.users
    ADD CONSTRAINT users_company_id_fkey FOREIGN KEY (company_id) REFERENCES public.companies(id);

ALTER TABLE ONLY public.users ALTER COLUMN email SET NOT NULL;

CREATE UNIQUE INDEX users_email_key ON public.users USING btree (email);

--
-- PostgreSQL database dump complete
--
";

fn run_schema(dump: &str) -> Conv {
    let mut conv = Conv::new();
    schema_pass(&mut conv, dump.as_bytes(), SqlDialect::Postgres).unwrap();
    conv
}

#[test]
fn test_chunk_statement_counts_sum_to_total() {
    // Every statement in PG_DUMP is well-terminated, so the counts from
    // successful chunk parses must sum to the number of top-level
    // statements (11: 2 SET, 3 CREATE TABLE, 1 CREATE SEQUENCE, 4 ALTER,
    // 1 CREATE INDEX).
    let mut conv = Conv::new();
    let mut reader = Reader::new(PG_DUMP.as_bytes());
    let parser = parser_for(SqlDialect::Postgres);
    let mut total = 0;
    loop {
        let (_, stmts) = read_and_parse_chunk(&mut conv, &mut reader, parser.as_ref()).unwrap();
        total += stmts.len();
        if reader.eof {
            break;
        }
    }
    assert_eq!(total, 11);
}

#[test]
fn test_schema_assembled_from_dump() {
    let conv = run_schema(PG_DUMP);

    assert_eq!(conv.src_schema.names(), &["companies", "users", "audit_log"]);

    let users = conv.src_schema.get("users").unwrap();
    assert_eq!(
        users.col_names,
        vec!["id", "company_id", "email", "active", "joined"]
    );
    assert_eq!(users.primary_keys, vec![Key::asc("id")]);
    assert!(users.get_column("email").unwrap().not_null);
    assert!(users.get_column("active").unwrap().ignored_default);
    assert_eq!(users.foreign_keys.len(), 1);
    assert_eq!(users.foreign_keys[0].refer_table, "companies");
    assert_eq!(users.indexes.len(), 1);
    assert!(users.indexes[0].unique);

    // The sequence statement was skipped, never an error.
    assert_eq!(
        conv.stats.statements.get("CreateSequence").map(|s| s.skip),
        Some(1)
    );
    assert_eq!(conv.statement_errors(), 0);
}

#[test]
fn test_keyless_table_gets_synthetic_key_appended_last() {
    let conv = run_schema(PG_DUMP);
    let audit = conv.target_schema.get("audit_log").unwrap();
    // Synthesized column is appended last and absent from the source
    // declaration.
    assert_eq!(audit.col_names, vec!["at", "entry", "synth_id"]);
    assert_eq!(audit.primary_keys, vec![Key::asc("synth_id")]);
    assert!(!conv
        .src_schema
        .get("audit_log")
        .unwrap()
        .col_names
        .contains(&"synth_id".to_string()));
}

#[test]
fn test_schema_only_runs_are_deterministic() {
    let a = run_schema(PG_DUMP);
    let b = run_schema(PG_DUMP);
    assert_eq!(a.src_schema, b.src_schema);
    assert_eq!(a.target_schema, b.target_schema);
    assert_eq!(a.synthetic_keys, b.synthetic_keys);
}

#[test]
fn test_alter_not_null_lands_on_column() {
    let dump = "CREATE TABLE t (x integer);\nALTER TABLE ONLY t ALTER COLUMN x SET NOT NULL;\n";
    let conv = run_schema(dump);
    assert!(conv.src_schema.get("t").unwrap().get_column("x").unwrap().not_null);
}

#[test]
fn test_duplicate_primary_key_replaces_and_logs_once() {
    let dump = "\
CREATE TABLE t (a integer, b integer);
ALTER TABLE ONLY t ADD CONSTRAINT pk1 PRIMARY KEY (a);
ALTER TABLE ONLY t ADD CONSTRAINT pk2 PRIMARY KEY (b);
";
    let conv = run_schema(dump);
    let t = conv.src_schema.get("t").unwrap();
    assert_eq!(t.primary_keys, vec![Key::asc("b")]);
    let replacements: i64 = conv
        .stats
        .unexpected
        .iter()
        .filter(|(msg, _)| msg.contains("second primary key"))
        .map(|(_, count)| *count)
        .sum();
    assert_eq!(replacements, 1);
}

#[test]
fn test_namespace_qualified_names() {
    let dump = "\
CREATE TABLE audit.events (id integer);
CREATE TABLE public.plain (id integer);
";
    let conv = run_schema(dump);
    assert!(conv.src_schema.contains("audit.events"));
    // The default namespace is omitted from derived names.
    assert!(conv.src_schema.contains("plain"));
}

#[test]
fn test_synthetic_keys_issue_sequential_values() {
    let dump = "\
CREATE TABLE t (v text);
INSERT INTO t (v) VALUES ('a');
INSERT INTO t (v) VALUES ('b');
INSERT INTO t (v) VALUES ('c');
";
    let mut conv = Conv::new();
    schema_pass(&mut conv, dump.as_bytes(), SqlDialect::Postgres).unwrap();
    let mut sink = CollectingSink::default();
    data_pass(&mut conv, dump.as_bytes(), SqlDialect::Postgres, &mut sink).unwrap();

    let seqs: Vec<_> = sink
        .rows
        .iter()
        .map(|(_, cols, vals)| {
            assert_eq!(cols.last().unwrap(), "synth_id");
            vals.last().unwrap().clone()
        })
        .collect();
    assert_eq!(
        seqs,
        vec![
            dumplift::data::Value::Int64(0),
            dumplift::data::Value::Int64(1),
            dumplift::data::Value::Int64(2)
        ]
    );
}

#[test]
fn test_function_body_semicolons_reparse_then_succeed() {
    let dump = "\
CREATE TABLE t (a integer);
CREATE FUNCTION bump() RETURNS trigger AS $fn$
BEGIN
    NEW.a := NEW.a + 1; RETURN NEW;
END;
$fn$ LANGUAGE plpgsql;
CREATE TABLE u (b integer);
";
    let conv = run_schema(dump);
    assert!(conv.src_schema.contains("t"));
    assert!(conv.src_schema.contains("u"));
    assert!(conv.stats.reparsed >= 1);
    assert_eq!(
        conv.stats.statements.get("CreateFunction").map(|s| s.skip),
        Some(1)
    );
}
