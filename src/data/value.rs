//! Converted row values and their SQL rendering.

use chrono::{DateTime, FixedOffset, NaiveDate};

/// A value in the target type system.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    /// Arbitrary-precision decimal, kept in validated textual form.
    Numeric(String),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(DateTime<FixedOffset>),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render as a SQL literal for the file sink.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float64(v) => {
                if v.is_finite() {
                    v.to_string()
                } else {
                    // Infinities and NaN need quoting in most dialects.
                    format!("'{v}'")
                }
            }
            Value::Numeric(s) => s.clone(),
            Value::String(s) => quote_string(s),
            Value::Bytes(b) => format!("X'{}'", hex::encode(b)),
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_sql_literal()).collect();
                format!("ARRAY[{}]", rendered.join(", "))
            }
        }
    }
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
