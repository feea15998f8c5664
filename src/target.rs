//! Target type system and schema mapping.
//!
//! The target store is strongly typed with a small closed type set; every
//! source type maps onto it (unmappable types degrade to unbounded strings,
//! with a diagnostic). Name sanitization happens only when DDL is rendered —
//! internally the target schema stays keyed by the source-derived names so
//! the data converter and the synthetic-key registry share one key space.

use crate::conv::Conv;
use crate::schema::{Column, Schema, Table, Type};

pub const BOOL: &str = "BOOL";
pub const INT64: &str = "INT64";
pub const FLOAT64: &str = "FLOAT64";
pub const NUMERIC: &str = "NUMERIC";
pub const STRING: &str = "STRING";
pub const BYTES: &str = "BYTES";
pub const DATE: &str = "DATE";
pub const TIMESTAMP: &str = "TIMESTAMP";

/// Map one source type onto the target type set. Returns the mapped type
/// and whether the mapping was exact (false = degraded to STRING).
pub fn to_target_type(src: &Type) -> (Type, bool) {
    let (name, mods): (&str, Vec<i64>) = match src.name.as_str() {
        "bool" | "boolean" => (BOOL, vec![]),
        "bigint" | "int8" | "bigserial" | "serial8" => (INT64, vec![]),
        "integer" | "int" | "int4" | "smallint" | "int2" | "mediumint" | "tinyint" | "serial"
        | "smallserial" | "serial4" | "serial2" | "year" => (INT64, vec![]),
        "int unsigned" | "integer unsigned" | "smallint unsigned" | "mediumint unsigned"
        | "tinyint unsigned" => (INT64, vec![]),
        // An unsigned bigint can exceed the signed 64-bit range.
        "bigint unsigned" => (NUMERIC, vec![]),
        "float8" | "float4" | "real" | "float" | "double" => (FLOAT64, vec![]),
        "numeric" | "decimal" | "money" => (NUMERIC, vec![]),
        "varchar" | "char" | "bpchar" | "nchar" | "nvarchar" | "varchar2" => {
            (STRING, src.mods.first().map(|m| vec![*m]).unwrap_or_default())
        }
        "text" | "tinytext" | "mediumtext" | "longtext" | "citext" | "uuid" | "json" | "jsonb"
        | "xml" | "enum" | "set" | "inet" | "cidr" | "macaddr" | "interval" | "bit" | "varbit"
        | "time" | "timetz" => (STRING, vec![]),
        "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            (BYTES, vec![])
        }
        "date" => (DATE, vec![]),
        "timestamp" | "timestamptz" | "datetime" => (TIMESTAMP, vec![]),
        _ => {
            return (
                Type {
                    name: STRING.to_string(),
                    mods: vec![],
                    array_bounds: src.array_bounds.clone(),
                },
                false,
            )
        }
    };
    (
        Type {
            name: name.to_string(),
            mods,
            array_bounds: src.array_bounds.clone(),
        },
        true,
    )
}

/// Build the target schema from the resolved source schema: same tables in
/// the same order, same column order, types mapped onto the target set.
/// Constraints carry over untouched (they were already resolved into the
/// canonical model during assembly).
pub fn build_target_schema(conv: &mut Conv) {
    let mut mapped = Vec::new();
    for src_table in conv.src_schema.iter() {
        let mut table = Table::new(&src_table.name);
        for col_name in &src_table.col_names {
            let src_col = match src_table.get_column(col_name) {
                Some(c) => c,
                None => continue,
            };
            let (ty, exact) = to_target_type(&src_col.ty);
            if !exact {
                mapped.push(format!(
                    "No mapping for type {} (column {}.{}); defaulting to {}",
                    src_col.ty, src_table.name, src_col.name, STRING
                ));
            }
            let mut col = Column::new(col_name, ty);
            col.not_null = src_col.not_null;
            col.ignored_default = src_col.ignored_default;
            table.push_column(col);
        }
        for fk in &src_table.foreign_keys {
            if !conv.src_schema.contains(&fk.refer_table) {
                mapped.push(format!(
                    "Foreign key on table {} references unknown table {}",
                    src_table.name, fk.refer_table
                ));
            }
        }
        table.primary_keys = src_table.primary_keys.clone();
        table.foreign_keys = src_table.foreign_keys.clone();
        table.indexes = src_table.indexes.clone();
        conv.target_schema.insert(table);
    }
    for msg in mapped {
        conv.unexpected(msg);
    }
}

/// Make a name acceptable to the target store: letters, digits and
/// underscores, starting with a letter. Dots from namespace-qualified
/// source names become underscores.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, 't');
    }
    out
}

/// Render a target type in DDL form.
pub fn render_type(ty: &Type) -> String {
    let base = match ty.name.as_str() {
        STRING => match ty.mods.first() {
            Some(n) => format!("{STRING}({n})"),
            None => format!("{STRING}(MAX)"),
        },
        BYTES => match ty.mods.first() {
            Some(n) => format!("{BYTES}({n})"),
            None => format!("{BYTES}(MAX)"),
        },
        other => other.to_string(),
    };
    if ty.is_array() {
        format!("ARRAY<{base}>")
    } else {
        base
    }
}

/// Render the finalized target schema as DDL text: one CREATE TABLE per
/// table (primary key trailing), then index and foreign-key statements.
pub fn render_ddl(schema: &Schema) -> String {
    let mut out = String::new();
    for table in schema.iter() {
        let tname = sanitize_name(&table.name);
        out.push_str(&format!("CREATE TABLE {tname} (\n"));
        for col_name in &table.col_names {
            if let Some(col) = table.get_column(col_name) {
                let null = if col.not_null { " NOT NULL" } else { "" };
                out.push_str(&format!(
                    "    {} {}{},\n",
                    sanitize_name(&col.name),
                    render_type(&col.ty),
                    null
                ));
            }
        }
        let pk: Vec<String> = table
            .primary_keys
            .iter()
            .map(|k| {
                if k.desc {
                    format!("{} DESC", sanitize_name(&k.column))
                } else {
                    sanitize_name(&k.column)
                }
            })
            .collect();
        out.push_str(&format!(") PRIMARY KEY ({});\n\n", pk.join(", ")));

        for index in &table.indexes {
            let unique = if index.unique { "UNIQUE " } else { "" };
            let keys: Vec<String> = index
                .keys
                .iter()
                .map(|k| {
                    if k.desc {
                        format!("{} DESC", sanitize_name(&k.column))
                    } else {
                        sanitize_name(&k.column)
                    }
                })
                .collect();
            out.push_str(&format!(
                "CREATE {}INDEX {} ON {} ({});\n\n",
                unique,
                sanitize_name(&index.name),
                tname,
                keys.join(", ")
            ));
        }
    }
    for table in schema.iter() {
        let tname = sanitize_name(&table.name);
        for fk in &table.foreign_keys {
            let cols: Vec<String> = fk.columns.iter().map(|c| sanitize_name(c)).collect();
            let refs: Vec<String> = fk.refer_columns.iter().map(|c| sanitize_name(c)).collect();
            let con = fk
                .name
                .as_ref()
                .map(|n| format!("CONSTRAINT {} ", sanitize_name(n)))
                .unwrap_or_default();
            out.push_str(&format!(
                "ALTER TABLE {} ADD {}FOREIGN KEY ({}) REFERENCES {} ({});\n",
                tname,
                con,
                cols.join(", "),
                sanitize_name(&fk.refer_table),
                refs.join(", ")
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mapping() {
        let (ty, exact) = to_target_type(&Type::new("integer"));
        assert_eq!(ty.name, INT64);
        assert!(exact);

        let (ty, _) = to_target_type(&Type::with_mods("varchar", vec![40]));
        assert_eq!(ty.name, STRING);
        assert_eq!(ty.mods, vec![40]);

        let (ty, _) = to_target_type(&Type::new("timestamptz"));
        assert_eq!(ty.name, TIMESTAMP);

        let (ty, exact) = to_target_type(&Type::new("tsvector"));
        assert_eq!(ty.name, STRING);
        assert!(!exact);
    }

    #[test]
    fn test_array_carries_through() {
        let src = Type {
            name: "text".to_string(),
            mods: vec![],
            array_bounds: vec![-1],
        };
        let (ty, _) = to_target_type(&src);
        assert_eq!(ty.array_bounds, vec![-1]);
        assert_eq!(render_type(&ty), "ARRAY<STRING(MAX)>");
    }

    #[test]
    fn test_render_type_bounds() {
        assert_eq!(render_type(&Type::new(INT64)), "INT64");
        assert_eq!(render_type(&Type::with_mods(STRING, vec![40])), "STRING(40)");
        assert_eq!(render_type(&Type::new(BYTES)), "BYTES(MAX)");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("audit.events"), "audit_events");
        assert_eq!(sanitize_name("user name"), "user_name");
        assert_eq!(sanitize_name("2fa"), "t2fa");
    }

    #[test]
    fn test_render_ddl_shape() {
        use crate::schema::Key;
        let mut schema = Schema::new();
        let mut t = Table::new("users");
        let mut id = Column::new("id", Type::new(INT64));
        id.not_null = true;
        t.push_column(id);
        t.push_column(Column::new("name", Type::with_mods(STRING, vec![40])));
        t.primary_keys = vec![Key::asc("id")];
        schema.insert(t);

        let ddl = render_ddl(&schema);
        assert!(ddl.contains("CREATE TABLE users ("));
        assert!(ddl.contains("    id INT64 NOT NULL,"));
        assert!(ddl.contains("    name STRING(40),"));
        assert!(ddl.contains(") PRIMARY KEY (id);"));
    }
}
