//! Bulk-copy block decoding.
//!
//! A copy block follows its header statement as raw tab-delimited lines,
//! terminated by a standalone `\.` marker. The block must be consumed in
//! both modes to advance the reader; rows are counted in both modes so
//! schema-only runs still report expected row volumes, but values are
//! split and converted only in data mode.
//!
//! Bulk escaping differs from insert-literal escaping: the dump doubles
//! backslashes here (`a\"b` arrives as `a\\"b`), so the block decoder
//! collapses doubled backslashes before splitting. Only the trailing line
//! terminator is trimmed — interior whitespace, including leading and
//! trailing spaces within a field, is significant.

use crate::conv::Conv;
use crate::data::process_data_row;
use crate::reader::Reader;
use crate::sink::RowSink;
use smallvec::SmallVec;
use std::io::Read;

/// Null marker inside a copy block (after backslash collapsing).
const NULL_MARKER: &str = "\\N";

/// Decode one copy block for `table`, feeding converted rows to the sink
/// in data mode. Reaching end of stream inside the block is a logged
/// truncation, not a fatal error.
pub fn process_copy_block<R: Read>(
    conv: &mut Conv,
    sink: &mut dyn RowSink,
    table: &str,
    cols: &[String],
    reader: &mut Reader<R>,
) -> std::io::Result<()> {
    loop {
        let line = reader.read_line()?;
        if line == b"\\.\n" || line == b"\\.\r\n" {
            return Ok(());
        }
        if reader.eof {
            conv.unexpected("Reached eof while parsing copy-block");
            return Ok(());
        }
        conv.stats_add_row(table);
        // The block has to be read either way; in schema mode, stop before
        // the splitting and conversion work — it is expensive for huge
        // datasets.
        if !conv.data_mode() {
            continue;
        }
        let s = String::from_utf8_lossy(&line);
        let s = s.replace("\\\\", "\\");
        let trimmed = s.trim_end_matches(['\n', '\r']);
        // Most tables are narrow; keep the per-row split off the heap.
        let vals: SmallVec<[Option<String>; 8]> = trimmed
            .split('\t')
            .map(|v| {
                if v == NULL_MARKER {
                    None
                } else {
                    Some(v.to_string())
                }
            })
            .collect();
        process_data_row(conv, sink, table, cols, &vals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::schema::{Column, Table, Type};
    use crate::sink::CollectingSink;
    use crate::target;

    fn conv_with_table() -> Conv {
        let mut conv = Conv::new();
        let mut t = Table::new("t");
        t.push_column(Column::new("a", Type::new("integer")));
        t.push_column(Column::new("b", Type::new("text")));
        conv.src_schema.insert(t);
        target::build_target_schema(&mut conv);
        conv
    }

    fn cols() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_copy_block_rows_converted() {
        let mut conv = conv_with_table();
        conv.set_data_mode();
        let mut sink = CollectingSink::default();
        let data = b"1\tx\n2\t\\N\n\\.\nSET x = 1;\n";
        let mut reader = Reader::new(&data[..]);
        process_copy_block(&mut conv, &mut sink, "t", &cols(), &mut reader).unwrap();

        assert_eq!(conv.stats.rows.get("t"), Some(&2));
        assert_eq!(sink.rows.len(), 2);
        assert_eq!(sink.rows[1].2[1], Value::Null);
        // The terminator is consumed; following statements remain.
        let next = reader.read_line().unwrap();
        assert_eq!(next, b"SET x = 1;\n");
    }

    #[test]
    fn test_copy_block_schema_mode_counts_only() {
        let mut conv = conv_with_table();
        let mut sink = CollectingSink::default();
        let data = b"1\tx\n2\ty\n\\.\n";
        let mut reader = Reader::new(&data[..]);
        process_copy_block(&mut conv, &mut sink, "t", &cols(), &mut reader).unwrap();

        assert_eq!(conv.stats.rows.get("t"), Some(&2));
        assert!(sink.rows.is_empty());
    }

    #[test]
    fn test_doubled_backslash_collapsed() {
        let mut conv = conv_with_table();
        conv.set_data_mode();
        let mut sink = CollectingSink::default();
        let data = b"1\ta\\\\\"b\n\\.\n";
        let mut reader = Reader::new(&data[..]);
        process_copy_block(&mut conv, &mut sink, "t", &cols(), &mut reader).unwrap();

        // `a\\"b` in the block decodes to the single-backslash original.
        assert_eq!(sink.rows[0].2[1], Value::String("a\\\"b".to_string()));
    }

    #[test]
    fn test_interior_whitespace_preserved() {
        let mut conv = conv_with_table();
        conv.set_data_mode();
        let mut sink = CollectingSink::default();
        let data = b"1\t a b \n\\.\n";
        let mut reader = Reader::new(&data[..]);
        process_copy_block(&mut conv, &mut sink, "t", &cols(), &mut reader).unwrap();

        assert_eq!(sink.rows[0].2[1], Value::String(" a b ".to_string()));
    }

    #[test]
    fn test_truncated_block_logged_not_fatal() {
        let mut conv = conv_with_table();
        conv.set_data_mode();
        let mut sink = CollectingSink::default();
        let data = b"1\tx\n2\ty";
        let mut reader = Reader::new(&data[..]);
        process_copy_block(&mut conv, &mut sink, "t", &cols(), &mut reader).unwrap();

        assert!(conv
            .stats
            .unexpected
            .keys()
            .any(|k| k.contains("eof while parsing copy-block")));
    }

    #[test]
    fn test_crlf_terminator() {
        let mut conv = conv_with_table();
        let mut sink = CollectingSink::default();
        let data = b"1\tx\r\n\\.\r\n";
        let mut reader = Reader::new(&data[..]);
        process_copy_block(&mut conv, &mut sink, "t", &cols(), &mut reader).unwrap();
        assert_eq!(conv.stats.rows.get("t"), Some(&1));
    }

    #[test]
    fn test_short_row_is_bad_but_counted() {
        let mut conv = conv_with_table();
        conv.set_data_mode();
        let mut sink = CollectingSink::default();
        let data = b"1\n\\.\n";
        let mut reader = Reader::new(&data[..]);
        process_copy_block(&mut conv, &mut sink, "t", &cols(), &mut reader).unwrap();

        assert_eq!(conv.stats.rows.get("t"), Some(&1));
        assert_eq!(conv.stats.bad_rows.get("t"), Some(&1));
        assert!(sink.rows.is_empty());
        assert_eq!(conv.sample_bad_rows(10).len(), 1);
    }
}
