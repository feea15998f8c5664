//! Resilient per-row data conversion.
//!
//! Converts one row's raw textual values into target-typed values using the
//! committed target schema, then hands the row to the sink. Any failure —
//! column-count mismatch, a single bad value, a sink error — is recorded
//! (bounded sample + per-table counter) and the run moves on. A malformed
//! row never aborts a migration.

mod copy;
mod value;

pub use copy::process_copy_block;
pub use value::Value;

use crate::conv::Conv;
use crate::schema::Type;
use crate::sink::RowSink;
use crate::target;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

/// Convert and emit one row.
///
/// `cols` is the statement's explicit column list; when empty, the source
/// schema's full column order applies (statements without a column list
/// supply every column positionally). Synthetic-key tables get their next
/// sequence value appended.
pub fn process_data_row(
    conv: &mut Conv,
    sink: &mut dyn RowSink,
    table: &str,
    cols: &[String],
    vals: &[Option<String>],
) {
    let cols: Vec<String> = if cols.is_empty() {
        match conv.src_schema.get(table) {
            Some(t) => t.col_names.clone(),
            None => Vec::new(),
        }
    } else {
        cols.to_vec()
    };

    match convert_row(conv, table, &cols, vals) {
        Ok((mut out_cols, mut values)) => {
            if let Some(seq) = conv.next_synthetic(table) {
                let key = conv
                    .synthetic_keys
                    .get(table)
                    .map(|k| k.col.clone())
                    .unwrap_or_default();
                out_cols.push(key);
                values.push(Value::Int64(seq));
            }
            if let Err(e) = sink.write_row(table, &out_cols, &values) {
                conv.unexpected(format!("Data write failed for table {table}: {e}"));
                conv.stats_add_bad_row(table);
            }
        }
        Err(e) => {
            conv.unexpected(format!("Bad row in table {table}: {e}"));
            conv.stats_add_bad_row(table);
            conv.collect_bad_row(table, &cols, vals);
        }
    }
}

/// Convert all values of a row, or explain why the row is bad.
fn convert_row(
    conv: &Conv,
    table: &str,
    cols: &[String],
    vals: &[Option<String>],
) -> Result<(Vec<String>, Vec<Value>), String> {
    let target_table = conv
        .target_schema
        .get(table)
        .ok_or_else(|| format!("table {table} not in target schema"))?;
    if cols.len() != vals.len() {
        return Err(format!(
            "expected {} column(s), got {} value(s)",
            cols.len(),
            vals.len()
        ));
    }
    let mut values = Vec::with_capacity(vals.len());
    for (name, raw) in cols.iter().zip(vals.iter()) {
        let col = target_table
            .get_column(name)
            .ok_or_else(|| format!("unknown column {name}"))?;
        let v = convert_value(raw, &col.ty, conv.timezone)
            .map_err(|e| format!("column {name}: {e}"))?;
        values.push(v);
    }
    Ok((cols.to_vec(), values))
}

/// Convert one raw textual value per its resolved target type.
pub fn convert_value(
    raw: &Option<String>,
    ty: &Type,
    tz: FixedOffset,
) -> Result<Value, String> {
    let s = match raw {
        None => return Ok(Value::Null),
        Some(s) => s.as_str(),
    };
    if ty.is_array() {
        return convert_array(s, ty, tz);
    }
    convert_scalar(s, ty, tz)
}

fn convert_scalar(s: &str, ty: &Type, tz: FixedOffset) -> Result<Value, String> {
    match ty.name.as_str() {
        target::BOOL => convert_bool(s),
        target::INT64 => s
            .trim()
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| format!("can't convert {s:?} to int64: {e}")),
        target::FLOAT64 => s
            .trim()
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| format!("can't convert {s:?} to float64: {e}")),
        target::NUMERIC => convert_numeric(s),
        target::STRING => Ok(Value::String(s.to_string())),
        target::BYTES => convert_bytes(s),
        target::DATE => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| format!("can't convert {s:?} to date: {e}")),
        target::TIMESTAMP => convert_timestamp(s.trim(), tz),
        other => Err(format!("no conversion for target type {other}")),
    }
}

fn convert_bool(s: &str) -> Result<Value, String> {
    match s.trim().to_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(Value::Bool(false)),
        _ => Err(format!("can't convert {s:?} to bool")),
    }
}

/// NUMERIC keeps its textual form (the stack carries no big-decimal type);
/// the syntax is validated so the sink can emit it unquoted.
fn convert_numeric(s: &str) -> Result<Value, String> {
    let t = s.trim();
    let bytes = t.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i = 1;
    }
    let mut digits = 0;
    let mut dot = false;
    let mut exp = false;
    let mut exp_digits = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => {
                if exp {
                    exp_digits += 1;
                } else {
                    digits += 1;
                }
            }
            b'.' if !dot && !exp => dot = true,
            b'e' | b'E' if digits > 0 && !exp => exp = true,
            b'+' | b'-' if exp && exp_digits == 0 => {}
            _ => return Err(format!("can't convert {s:?} to numeric")),
        }
        i += 1;
    }
    if digits == 0 || (exp && exp_digits == 0) {
        return Err(format!("can't convert {s:?} to numeric"));
    }
    Ok(Value::Numeric(t.to_string()))
}

/// Byte strings arrive in hex form (`\x4142`); anything else is taken as
/// raw bytes.
fn convert_bytes(s: &str) -> Result<Value, String> {
    if let Some(hex_part) = s.strip_prefix("\\x") {
        return hex::decode(hex_part)
            .map(Value::Bytes)
            .map_err(|e| format!("can't convert {s:?} to bytes: {e}"));
    }
    Ok(Value::Bytes(s.as_bytes().to_vec()))
}

const TS_ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
];

const TS_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Timestamps with an explicit zone keep it; zoneless ones are interpreted
/// in the session zone carried by Conv.
fn convert_timestamp(s: &str, tz: FixedOffset) -> Result<Value, String> {
    for f in TS_ZONED_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, f) {
            return Ok(Value::Timestamp(ts));
        }
    }
    for f in TS_NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, f) {
            return match tz.from_local_datetime(&naive) {
                chrono::LocalResult::Single(ts) => Ok(Value::Timestamp(ts)),
                _ => Err(format!("ambiguous timestamp {s:?}")),
            };
        }
    }
    Err(format!("can't convert {s:?} to timestamp"))
}

/// Array literal: `{a,b,NULL,"c d"}`. Elements convert per the scalar type.
fn convert_array(s: &str, ty: &Type, tz: FixedOffset) -> Result<Value, String> {
    let t = s.trim();
    if !t.starts_with('{') || !t.ends_with('}') {
        return Err(format!("can't convert {s:?} to array: missing braces"));
    }
    let inner = &t[1..t.len() - 1];
    let scalar = Type {
        name: ty.name.clone(),
        mods: ty.mods.clone(),
        array_bounds: Vec::new(),
    };
    let mut out = Vec::new();
    for element in split_array_elements(inner) {
        match element {
            None => out.push(Value::Null),
            Some(text) => out.push(convert_scalar(&text, &scalar, tz)?),
        }
    }
    Ok(Value::Array(out))
}

/// Split array elements on commas, honoring double-quoted elements with
/// backslash escapes. An unquoted bare NULL is a null element.
fn split_array_elements(inner: &str) -> Vec<Option<String>> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut was_quoted = false;
    let mut chars = inner.chars().peekable();

    let mut flush = |current: &mut String, was_quoted: &mut bool, out: &mut Vec<Option<String>>| {
        // Whitespace is significant inside quoted elements only.
        let text = if *was_quoted {
            current.clone()
        } else {
            current.trim().to_string()
        };
        if text.is_empty() && !*was_quoted {
            current.clear();
            return;
        }
        if !*was_quoted && text == "NULL" {
            out.push(None);
        } else {
            out.push(Some(text));
        }
        current.clear();
        *was_quoted = false;
    };

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                quoted = !quoted;
                was_quoted = true;
            }
            '\\' if quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' if !quoted => flush(&mut current, &mut was_quoted, &mut out),
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut was_quoted, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_convert_scalars() {
        let tz = utc();
        assert_eq!(
            convert_value(&some("t"), &Type::new(target::BOOL), tz),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            convert_value(&some("42"), &Type::new(target::INT64), tz),
            Ok(Value::Int64(42))
        );
        assert_eq!(
            convert_value(&some("1.5"), &Type::new(target::FLOAT64), tz),
            Ok(Value::Float64(1.5))
        );
        assert_eq!(
            convert_value(&some("12345678901234567890.5"), &Type::new(target::NUMERIC), tz),
            Ok(Value::Numeric("12345678901234567890.5".to_string()))
        );
        assert_eq!(
            convert_value(&None, &Type::new(target::STRING), tz),
            Ok(Value::Null)
        );
    }

    #[test]
    fn test_convert_int_failure() {
        assert!(convert_value(&some("7.1"), &Type::new(target::INT64), utc()).is_err());
        assert!(convert_value(&some(""), &Type::new(target::INT64), utc()).is_err());
    }

    #[test]
    fn test_convert_bytes_hex() {
        assert_eq!(
            convert_value(&some("\\x4142"), &Type::new(target::BYTES), utc()),
            Ok(Value::Bytes(vec![0x41, 0x42]))
        );
        assert_eq!(
            convert_value(&some("raw"), &Type::new(target::BYTES), utc()),
            Ok(Value::Bytes(b"raw".to_vec()))
        );
    }

    #[test]
    fn test_convert_date() {
        assert_eq!(
            convert_value(&some("2020-02-29"), &Type::new(target::DATE), utc()),
            Ok(Value::Date(NaiveDate::from_ymd_opt(2020, 2, 29).unwrap()))
        );
        assert!(convert_value(&some("2021-02-29"), &Type::new(target::DATE), utc()).is_err());
    }

    #[test]
    fn test_convert_timestamp_zoned() {
        let v = convert_value(
            &some("2020-01-02 03:04:05.5+02"),
            &Type::new(target::TIMESTAMP),
            utc(),
        )
        .unwrap();
        match v {
            Value::Timestamp(ts) => {
                assert_eq!(ts.offset().local_minus_utc(), 2 * 3600);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_convert_timestamp_uses_session_zone() {
        let tz = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let v = convert_value(
            &some("2020-01-02 03:04:05"),
            &Type::new(target::TIMESTAMP),
            tz,
        )
        .unwrap();
        match v {
            Value::Timestamp(ts) => {
                assert_eq!(ts.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_convert_array() {
        let ty = Type {
            name: target::INT64.to_string(),
            mods: vec![],
            array_bounds: vec![-1],
        };
        assert_eq!(
            convert_value(&some("{1,2,NULL}"), &ty, utc()),
            Ok(Value::Array(vec![
                Value::Int64(1),
                Value::Int64(2),
                Value::Null
            ]))
        );
    }

    #[test]
    fn test_convert_string_array_quoted() {
        let ty = Type {
            name: target::STRING.to_string(),
            mods: vec![],
            array_bounds: vec![-1],
        };
        assert_eq!(
            convert_value(&some(r#"{"a b","c\"d",plain,"NULL",NULL}"#), &ty, utc()),
            Ok(Value::Array(vec![
                Value::String("a b".to_string()),
                Value::String("c\"d".to_string()),
                Value::String("plain".to_string()),
                Value::String("NULL".to_string()),
                Value::Null,
            ]))
        );
    }
}
