//! Statement dispatch and incremental schema assembly.
//!
//! Builds the source schema table-by-table from parsed statements and
//! resolves constraints into the canonical model. Dispatch is exhaustive
//! over the closed statement set; anything unhandled is an explicit skip
//! with a per-kind tag. Nothing here is fatal: broken statements become
//! error tallies and diagnostics, unknown tables become skips, and the run
//! continues.

use crate::conv::Conv;
use crate::parser::ast::{
    AlterCmd, ColumnClause, ConstraintClause, ConstraintKind, CopyFrom, CreateIndex, CreateTable,
    Insert, QualifiedName, SetVariable, Statement,
};
use crate::schema::{build_table_name, Column, ForeignKey, Index, Key, Table, Type};

/// Namespace component dropped from derived table names.
pub const DEFAULT_NAMESPACE: &str = "public";

/// Placeholder for a copy block whose header could not be resolved; the
/// block must still be decoded to advance past it.
const BOGUS_COPY_TABLE: &str = "BOGUS_COPY_FROM_TABLE";

/// Data event produced by the dispatcher: the start of a bulk-copy block,
/// or an insert's rows. Only meaningful row sources reach the converter;
/// everything else is handled (and tallied) in place.
#[derive(Debug, Clone, PartialEq)]
pub enum CopyOrInsert {
    Copy {
        table: String,
        cols: Vec<String>,
    },
    Insert {
        table: String,
        cols: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    },
}

/// Resolved transient constraint, shared across the create and alter paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub name: Option<String>,
    pub cols: Vec<String>,
    pub refer_table: String,
    pub refer_cols: Vec<String>,
}

/// Process one parsed statement batch, updating schema state and returning
/// a data event if a copy or insert was encountered.
///
/// A copy block follows its statement in the stream, so a CopyFrom that is
/// not last in its batch means the remaining statements sit inside the
/// block; they are dropped with a diagnostic.
pub fn process_statements(conv: &mut Conv, stmts: &[Statement]) -> Option<CopyOrInsert> {
    for (i, stmt) in stmts.iter().enumerate() {
        match stmt {
            Statement::CreateTable(ct) => {
                if conv.schema_mode() {
                    process_create_table(conv, ct);
                }
            }
            Statement::AlterTable(at) => {
                if conv.schema_mode() {
                    process_alter_table(conv, at);
                }
            }
            Statement::CopyFrom(cf) => {
                if i != stmts.len() - 1 {
                    conv.unexpected(
                        "CopyFrom is not the last statement in batch: ignoring following statements",
                    );
                    conv.error_in_statement("CopyFrom");
                }
                return Some(process_copy_stmt(conv, cf));
            }
            Statement::Insert(ins) => {
                if let Some(ci) = process_insert_stmt(conv, ins) {
                    return Some(ci);
                }
            }
            Statement::CreateIndex(ci) => {
                if conv.schema_mode() {
                    process_index_stmt(conv, ci);
                }
            }
            Statement::SetVariable(sv) => {
                if conv.schema_mode() {
                    process_set_variable(conv, sv);
                }
            }
            Statement::Unsupported { tag } => {
                conv.skip_statement(tag);
            }
        }
    }
    None
}

/// Derive the canonical table name, or record a statement error.
fn table_name(conv: &mut Conv, tag: &str, name: &QualifiedName) -> Option<String> {
    match build_table_name(
        &name.catalog,
        &name.namespace,
        &name.relation,
        DEFAULT_NAMESPACE,
    ) {
        Some(n) => Some(n),
        None => {
            log_stmt_error(conv, tag, "can't get table name: relation is empty");
            None
        }
    }
}

fn log_stmt_error(conv: &mut Conv, tag: &str, detail: &str) {
    conv.unexpected(format!("Processing {tag} statement: {detail}"));
    conv.error_in_statement(tag);
}

fn process_create_table(conv: &mut Conv, ct: &CreateTable) {
    let table = match table_name(conv, "CreateTable", &ct.name) {
        Some(t) => t,
        None => return,
    };
    if ct.inherited {
        // Inherited tables get no schema entry; all later references to
        // them fall through the unknown-table skip paths.
        conv.skip_statement("CreateTable");
        conv.unexpected(format!(
            "Found inherited table {table} -- we do not currently handle inherited tables"
        ));
        return;
    }

    let mut t = Table::new(&table);
    let mut constraints: Vec<Constraint> = Vec::new();
    for clause in &ct.columns {
        let (col, col_constraints) = process_column(conv, clause, &table);
        constraints.extend(col_constraints);
        t.push_column(col);
    }
    for clause in &ct.constraints {
        constraints.push(resolve_constraint(conv, clause));
    }

    conv.schema_statement("CreateTable");
    conv.src_schema.insert(t);
    update_schema(conv, &table, &constraints, "CREATE TABLE");
}

/// Build a column definition plus its inline constraints. Inline clauses
/// carry no column list — their implicit target is this column.
fn process_column(conv: &mut Conv, clause: &ColumnClause, table: &str) -> (Column, Vec<Constraint>) {
    let ty = Type {
        name: clause.type_name.clone(),
        mods: clause.type_mods.clone(),
        array_bounds: clause.array_bounds.clone(),
    };
    let col = Column::new(&clause.name, ty);
    let mut out = Vec::new();
    for c in &clause.constraints {
        let mut resolved = resolve_constraint(conv, c);
        if !resolved.cols.is_empty() {
            conv.unexpected(format!(
                "Column constraint on {table}.{} has explicit keys",
                clause.name
            ));
        }
        resolved.cols = vec![clause.name.clone()];
        out.push(resolved);
    }
    (col, out)
}

/// Resolve a parsed constraint clause, deriving the referent table name for
/// foreign keys.
fn resolve_constraint(conv: &mut Conv, clause: &ConstraintClause) -> Constraint {
    let mut refer_table = String::new();
    if clause.kind == ConstraintKind::ForeignKey {
        match &clause.refer_table {
            Some(name) => {
                match build_table_name(
                    &name.catalog,
                    &name.namespace,
                    &name.relation,
                    DEFAULT_NAMESPACE,
                ) {
                    Some(n) => refer_table = n,
                    None => conv.unexpected(
                        "Processing foreign key constraint: referenced table name is empty",
                    ),
                }
            }
            None => {
                conv.unexpected("Processing foreign key constraint: no referenced table");
            }
        }
    }
    Constraint {
        kind: clause.kind.clone(),
        name: clause.name.clone(),
        cols: clause.columns.clone(),
        refer_table,
        refer_cols: clause.refer_columns.clone(),
    }
}

fn process_alter_table(conv: &mut Conv, at: &crate::parser::ast::AlterTable) {
    let table = match table_name(conv, "AlterTable", &at.name) {
        Some(t) => t,
        None => return,
    };
    if !conv.src_schema.contains(&table) {
        // Alters also target views, sequences and skipped inherited
        // tables; none of those have entries, so the whole statement is a
        // skip, never an error.
        conv.skip_statement("AlterTable");
        return;
    }
    for cmd in &at.cmds {
        match cmd {
            AlterCmd::SetNotNull { column } => {
                let c = Constraint {
                    kind: ConstraintKind::NotNull,
                    name: None,
                    cols: vec![column.clone()],
                    refer_table: String::new(),
                    refer_cols: Vec::new(),
                };
                update_schema(conv, &table, &[c], "ALTER TABLE");
                conv.schema_statement("AlterTable.SetNotNull");
            }
            AlterCmd::AddConstraint(clause) => {
                let c = resolve_constraint(conv, clause);
                update_schema(conv, &table, &[c], "ALTER TABLE");
                conv.schema_statement("AlterTable.AddConstraint");
            }
            AlterCmd::Other { tag } => {
                conv.skip_statement(&format!("AlterTable.{tag}"));
            }
        }
    }
}

fn process_index_stmt(conv: &mut Conv, ci: &CreateIndex) {
    let table = match table_name(conv, "CreateIndex", &ci.table) {
        Some(t) => t,
        None => return,
    };
    if let Some(t) = conv.src_schema.get_mut(&table) {
        t.indexes.push(Index {
            name: ci.name.clone(),
            unique: ci.unique,
            keys: ci
                .keys
                .iter()
                .map(|(col, desc)| Key {
                    column: col.clone(),
                    desc: *desc,
                })
                .collect(),
        });
        conv.schema_statement("CreateIndex");
    } else {
        conv.unexpected(format!(
            "Table {table} not found while processing index statement"
        ));
        conv.skip_statement("CreateIndex");
    }
}

fn process_set_variable(conv: &mut Conv, sv: &SetVariable) {
    if sv.name == "timezone" {
        match crate::conv::parse_timezone(&sv.value) {
            Some(tz) => {
                conv.set_timezone(tz);
                conv.schema_statement("SetVariable");
            }
            None => {
                conv.unexpected(format!("Unrecognized time zone {}", sv.value));
                conv.skip_statement("SetVariable");
            }
        }
    } else {
        conv.skip_statement("SetVariable");
    }
}

fn process_copy_stmt(conv: &mut Conv, cf: &CopyFrom) -> CopyOrInsert {
    // Always produce a Copy event, even on errors — otherwise the data
    // portion of the block cannot be consumed and the run would wedge at
    // this point of the dump.
    let table = match build_table_name(
        &cf.name.catalog,
        &cf.name.namespace,
        &cf.name.relation,
        DEFAULT_NAMESPACE,
    ) {
        Some(t) => t,
        None => {
            log_stmt_error(conv, "CopyFrom", "can't get table name: relation is empty");
            BOGUS_COPY_TABLE.to_string()
        }
    };
    if !conv.src_schema.contains(&table) {
        // No schema entry (most likely an inherited table we skipped);
        // drop the block's rows but still decode past it.
        conv.skip_statement("CopyFrom");
        return CopyOrInsert::Copy {
            table,
            cols: Vec::new(),
        };
    }
    conv.data_statement("CopyFrom");
    CopyOrInsert::Copy {
        table,
        cols: cf.columns.clone(),
    }
}

fn process_insert_stmt(conv: &mut Conv, ins: &Insert) -> Option<CopyOrInsert> {
    let table = match table_name(conv, "Insert", &ins.name) {
        Some(t) => t,
        None => return None,
    };
    if !conv.src_schema.contains(&table) {
        // Tables without schema entries (inherited, or never created in
        // this dump) drop their inserts.
        conv.skip_statement("Insert");
        return None;
    }
    for _ in &ins.rows {
        conv.stats_add_row(&table);
    }
    conv.data_statement("Insert");
    if conv.data_mode() {
        return Some(CopyOrInsert::Insert {
            table,
            cols: ins.columns.clone(),
            rows: ins.rows.clone(),
        });
    }
    None
}

/// Apply resolved constraints to a table (shared by the create and alter
/// paths).
pub fn update_schema(conv: &mut Conv, table: &str, constraints: &[Constraint], stmt_kind: &str) {
    for c in constraints {
        match &c.kind {
            ConstraintKind::PrimaryKey => {
                let had_pk = conv
                    .src_schema
                    .get(table)
                    .map(|t| !t.primary_keys.is_empty())
                    .unwrap_or(false);
                if had_pk {
                    // Multiple primary keys are illegal upstream; tolerate
                    // by replacing, with a diagnostic.
                    conv.unexpected(format!(
                        "{stmt_kind} statement is adding a second primary key"
                    ));
                }
                if let Some(t) = conv.src_schema.get_mut(table) {
                    t.primary_keys = c.cols.iter().map(|col| Key::asc(col)).collect();
                }
                // The target requires key columns to be non-null even where
                // the source tolerated nullable keys.
                update_cols(conv, table, &ConstraintKind::NotNull, &c.cols);
            }
            ConstraintKind::ForeignKey => {
                if let Some(t) = conv.src_schema.get_mut(table) {
                    t.foreign_keys.push(ForeignKey {
                        name: c.name.clone(),
                        columns: c.cols.clone(),
                        refer_table: c.refer_table.clone(),
                        refer_columns: c.refer_cols.clone(),
                    });
                }
            }
            ConstraintKind::Unique => {
                // The target has no column-level uniqueness; a unique
                // constraint becomes a uniqueness-enforcing index.
                let name = c.name.clone().unwrap_or_else(|| {
                    let n = conv
                        .src_schema
                        .get(table)
                        .map(|t| t.indexes.len())
                        .unwrap_or(0);
                    format!("{}_uniq_{}", table.replace('.', "_"), n)
                });
                if let Some(t) = conv.src_schema.get_mut(table) {
                    t.indexes.push(Index {
                        name,
                        unique: true,
                        keys: c.cols.iter().map(|col| Key::asc(col)).collect(),
                    });
                }
            }
            ConstraintKind::NotNull | ConstraintKind::Default => {
                update_cols(conv, table, &c.kind, &c.cols);
            }
            ConstraintKind::Other(tag) => {
                conv.unexpected(format!("Ignoring {tag} constraint on table {table}"));
            }
        }
    }
}

/// Apply a column-scoped constraint kind to each named column definition.
fn update_cols(conv: &mut Conv, table: &str, kind: &ConstraintKind, cols: &[String]) {
    let mut missing = Vec::new();
    if let Some(t) = conv.src_schema.get_mut(table) {
        for name in cols {
            match t.col_defs.get_mut(name) {
                Some(cd) => match kind {
                    ConstraintKind::NotNull => cd.not_null = true,
                    ConstraintKind::Default => cd.ignored_default = true,
                    _ => {}
                },
                None => missing.push(name.clone()),
            }
        }
    }
    for name in missing {
        conv.unexpected(format!("Constraint on unknown column {table}.{name}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parser_for, SqlDialect};

    fn run_schema(sql: &str) -> Conv {
        let mut conv = Conv::new();
        conv.set_schema_mode();
        let parser = parser_for(SqlDialect::Postgres);
        let stmts = parser.parse_statements(sql, true).unwrap();
        process_statements(&mut conv, &stmts);
        conv
    }

    #[test]
    fn test_create_table_assembles() {
        let conv = run_schema(
            "CREATE TABLE public.users (id integer NOT NULL, name text, PRIMARY KEY (id));",
        );
        let t = conv.src_schema.get("users").unwrap();
        assert_eq!(t.col_names, vec!["id", "name"]);
        assert_eq!(t.primary_keys, vec![Key::asc("id")]);
        assert!(t.get_column("id").unwrap().not_null);
    }

    #[test]
    fn test_pk_forces_not_null() {
        let conv = run_schema("CREATE TABLE t (id integer, PRIMARY KEY (id));");
        assert!(conv.src_schema.get("t").unwrap().get_column("id").unwrap().not_null);
    }

    #[test]
    fn test_second_pk_replaces_with_diagnostic() {
        let conv = run_schema(
            "CREATE TABLE t (a integer, b integer, PRIMARY KEY (a));\nALTER TABLE t ADD CONSTRAINT pk2 PRIMARY KEY (b);",
        );
        let t = conv.src_schema.get("t").unwrap();
        assert_eq!(t.primary_keys, vec![Key::asc("b")]);
        let diags: i64 = conv
            .stats
            .unexpected
            .iter()
            .filter(|(k, _)| k.contains("second primary key"))
            .map(|(_, v)| *v)
            .sum();
        assert_eq!(diags, 1);
    }

    #[test]
    fn test_inherited_table_skipped() {
        let conv = run_schema("CREATE TABLE child (x integer) INHERITS (parent);");
        assert!(!conv.src_schema.contains("child"));
        assert_eq!(
            conv.stats.statements.get("CreateTable").unwrap().skip,
            1
        );
        // Follow-on references fall through the unknown-table path.
        let mut conv = conv;
        let parser = parser_for(SqlDialect::Postgres);
        let stmts = parser
            .parse_statements("ALTER TABLE child ALTER COLUMN x SET NOT NULL;", true)
            .unwrap();
        process_statements(&mut conv, &stmts);
        assert_eq!(conv.stats.statements.get("AlterTable").unwrap().skip, 1);
    }

    #[test]
    fn test_alter_unknown_table_is_skip() {
        let conv = run_schema("ALTER TABLE missing ALTER COLUMN x SET NOT NULL;");
        assert_eq!(conv.stats.statements.get("AlterTable").unwrap().skip, 1);
        assert_eq!(conv.statement_errors(), 0);
    }

    #[test]
    fn test_alter_set_not_null() {
        let conv = run_schema(
            "CREATE TABLE t (x integer);\nALTER TABLE ONLY t ALTER COLUMN x SET NOT NULL;",
        );
        assert!(conv.src_schema.get("t").unwrap().get_column("x").unwrap().not_null);
    }

    #[test]
    fn test_unique_becomes_index() {
        let conv = run_schema("CREATE TABLE t (a integer, UNIQUE (a));");
        let t = conv.src_schema.get("t").unwrap();
        assert_eq!(t.indexes.len(), 1);
        assert!(t.indexes[0].unique);
        assert_eq!(t.indexes[0].name, "t_uniq_0");
        assert_eq!(t.indexes[0].keys, vec![Key::asc("a")]);
    }

    #[test]
    fn test_foreign_keys_accumulate() {
        let conv = run_schema(
            "CREATE TABLE t (a integer, b integer, FOREIGN KEY (a) REFERENCES x (id), FOREIGN KEY (b) REFERENCES y (id));",
        );
        let t = conv.src_schema.get("t").unwrap();
        assert_eq!(t.foreign_keys.len(), 2);
        assert_eq!(t.foreign_keys[0].refer_table, "x");
        assert_eq!(t.foreign_keys[1].refer_table, "y");
    }

    #[test]
    fn test_create_index_on_known_table() {
        let conv = run_schema(
            "CREATE TABLE t (a integer);\nCREATE INDEX t_a_idx ON t (a DESC);",
        );
        let t = conv.src_schema.get("t").unwrap();
        assert_eq!(t.indexes.len(), 1);
        assert!(t.indexes[0].keys[0].desc);
    }

    #[test]
    fn test_create_index_unknown_table_skipped() {
        let conv = run_schema("CREATE INDEX i ON missing (a);");
        assert_eq!(conv.stats.statements.get("CreateIndex").unwrap().skip, 1);
    }

    #[test]
    fn test_timezone_applied() {
        let conv = run_schema("SET timezone = '+02:00';");
        assert_eq!(conv.timezone.local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_unsupported_skipped_with_tag() {
        let conv = run_schema("CREATE SEQUENCE s;\nGRANT ALL ON t TO x;");
        assert_eq!(conv.stats.statements.get("CreateSequence").unwrap().skip, 1);
        assert_eq!(conv.stats.statements.get("Grant").unwrap().skip, 1);
    }

    #[test]
    fn test_copy_unknown_table_still_yields_event() {
        let mut conv = Conv::new();
        let parser = parser_for(SqlDialect::Postgres);
        let stmts = parser
            .parse_statements("COPY missing (a) FROM stdin;", true)
            .unwrap();
        let ci = process_statements(&mut conv, &stmts);
        assert_eq!(
            ci,
            Some(CopyOrInsert::Copy {
                table: "missing".to_string(),
                cols: Vec::new()
            })
        );
        assert_eq!(conv.stats.statements.get("CopyFrom").unwrap().skip, 1);
    }

    #[test]
    fn test_insert_counts_rows_in_schema_mode() {
        let conv = run_schema(
            "CREATE TABLE t (a integer);\nINSERT INTO t (a) VALUES (1), (2), (3);",
        );
        assert_eq!(conv.stats.rows.get("t"), Some(&3));
    }
}
