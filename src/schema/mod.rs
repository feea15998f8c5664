//! Canonical schema model shared by the source and target sides.
//!
//! This module provides:
//! - Data models for tables, columns, types, keys, foreign keys and indexes
//! - An insertion-ordered table map (column and table order are significant:
//!   they govern positional row alignment and rendering)
//! - Table-name derivation from qualified names

mod assembler;

pub use assembler::*;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A source or target column type: base name plus numeric modifiers
/// (length/precision) and array bounds (one entry per array dimension,
/// -1 for an unspecified bound).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Type {
    pub name: String,
    pub mods: Vec<i64>,
    pub array_bounds: Vec<i64>,
}

impl Type {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mods: Vec::new(),
            array_bounds: Vec::new(),
        }
    }

    pub fn with_mods(name: &str, mods: Vec<i64>) -> Self {
        Self {
            name: name.to_string(),
            mods,
            array_bounds: Vec::new(),
        }
    }

    /// Whether this type has at least one array dimension.
    pub fn is_array(&self) -> bool {
        !self.array_bounds.is_empty()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.mods.is_empty() {
            let mods: Vec<String> = self.mods.iter().map(|m| m.to_string()).collect();
            write!(f, "({})", mods.join(","))?;
        }
        for _ in &self.array_bounds {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Column definition within a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: Type,
    /// NOT NULL constraint (primary-key columns are always forced NOT NULL).
    pub not_null: bool,
    /// A DEFAULT clause was present but is not carried to the target.
    pub ignored_default: bool,
}

impl Column {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            not_null: false,
            ignored_default: false,
        }
    }
}

/// A single key part: column name plus sort direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub column: String,
    pub desc: bool,
}

impl Key {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            desc: false,
        }
    }
}

/// Foreign key constraint. Many are allowed per table; order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub refer_table: String,
    pub refer_columns: Vec<String>,
}

/// Index definition. Unique column constraints become unique indexes,
/// since the target model has no column-level uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    pub keys: Vec<Key>,
}

/// Table definition: ordered column names plus a definition map.
///
/// `col_names` is insertion order and is never reordered — it governs
/// positional row alignment for statements without an explicit column list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub col_names: Vec<String>,
    pub col_defs: AHashMap<String, Column>,
    /// At most one primary key; assigning a second overwrites the first.
    pub primary_keys: Vec<Key>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<Index>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Append a column, keeping `col_names` and `col_defs` in sync.
    pub fn push_column(&mut self, col: Column) {
        self.col_names.push(col.name.clone());
        self.col_defs.insert(col.name.clone(), col);
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.col_defs.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.col_defs.contains_key(name)
    }
}

/// Insertion-ordered map of tables, keyed by derived table name.
///
/// Iteration order matters for determinism: the primary-key finalizer and
/// every report walk tables in the order they were created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    names: Vec<String>,
    tables: AHashMap<String, Table>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Insert or replace a table. First insertion fixes its position.
    pub fn insert(&mut self, table: Table) {
        if !self.tables.contains_key(&table.name) {
            self.names.push(table.name.clone());
        }
        self.tables.insert(table.name.clone(), table);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Table names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Iterate tables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.names.iter().filter_map(|n| self.tables.get(n))
    }
}

/// Build a table name from up to three namespace components.
///
/// Empty components are dropped, the remainder is joined with "." and the
/// conventional default namespace is omitted (dumps qualify most relations
/// with it, but carrying it through would bloat every derived name).
/// The relation name itself must be non-empty.
pub fn build_table_name(
    catalog: &str,
    namespace: &str,
    relation: &str,
    default_namespace: &str,
) -> Option<String> {
    if relation.is_empty() {
        return None;
    }
    let mut parts: Vec<&str> = Vec::new();
    if !catalog.is_empty() {
        parts.push(catalog);
    }
    if !namespace.is_empty() && namespace != default_namespace {
        parts.push(namespace);
    }
    parts.push(relation);
    Some(parts.join("."))
}
