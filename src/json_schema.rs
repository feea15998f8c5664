//! JSON Schema generation for CLI output types.
//!
//! Schemas are generated with schemars for every output that supports
//! --json, keyed by subcommand. BTreeMap keeps the listing deterministic
//! (important for diffable output).

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// Returns all JSON schemas for outputs that support --json.
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();
    schemas.insert("report", schema_for!(crate::report::MigrationReport));
    schemas
}

/// Generate a single schema by name.
pub fn get_schema(name: &str) -> Option<Schema> {
    all_schemas().remove(name)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
