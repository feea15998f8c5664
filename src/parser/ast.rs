//! Abstract statements produced by the dialect parsers.
//!
//! The variant set is closed: everything the assembler and the data path can
//! act on is enumerated here, and anything else arrives as `Unsupported`
//! carrying a tag for the skip accounting. Handlers dispatch exhaustively —
//! an unmatched kind is always an explicit skip, never a silent no-op.

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    Insert(Insert),
    CopyFrom(CopyFrom),
    CreateIndex(CreateIndex),
    SetVariable(SetVariable),
    /// Recognized as a statement but not one we act on. The tag names the
    /// leading keyword(s), e.g. "CreateSequence" or "Grant".
    Unsupported { tag: String },
}

/// Qualified relation name as written in the dump (pre-derivation).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualifiedName {
    pub catalog: String,
    pub namespace: String,
    pub relation: String,
}

/// Column clause inside CREATE TABLE: name, type reference and any inline
/// constraints (whose implicit target is this column).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnClause {
    pub name: String,
    pub type_name: String,
    pub type_mods: Vec<i64>,
    pub array_bounds: Vec<i64>,
    pub constraints: Vec<ConstraintClause>,
}

/// Transient constraint representation, shared by table-level clauses,
/// inline column clauses and ALTER TABLE ADD CONSTRAINT.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintClause {
    pub kind: ConstraintKind,
    pub name: Option<String>,
    pub columns: Vec<String>,
    /// FOREIGN KEY only.
    pub refer_table: Option<QualifiedName>,
    pub refer_columns: Vec<String>,
}

impl ConstraintClause {
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            name: None,
            columns: Vec::new(),
            refer_table: None,
            refer_columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    NotNull,
    Default,
    /// Anything else (CHECK, EXCLUDE, ...); tag kept for diagnostics.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: QualifiedName,
    pub columns: Vec<ColumnClause>,
    pub constraints: Vec<ConstraintClause>,
    /// Table inheritance was declared (INHERITS clause); such tables are
    /// skipped wholesale by the assembler.
    pub inherited: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub name: QualifiedName,
    pub cmds: Vec<AlterCmd>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterCmd {
    SetNotNull { column: String },
    AddConstraint(ConstraintClause),
    /// Unhandled sub-command; tag for skip accounting.
    Other { tag: String },
}

/// INSERT with values already reduced to raw text (None = NULL literal).
/// Expressions the parser cannot reduce are dropped from the row, which the
/// converter later surfaces as a column-count mismatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub name: QualifiedName,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyFrom {
    pub name: QualifiedName,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: String,
    pub table: QualifiedName,
    pub unique: bool,
    /// (column, descending) pairs in key order.
    pub keys: Vec<(String, bool)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetVariable {
    pub name: String,
    pub value: String,
}
