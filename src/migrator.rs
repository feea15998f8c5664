//! Dump-processing driver.
//!
//! Ties the reader, chunk assembler, dialect parser, schema assembler and
//! data converter together around one Conv. Processing is strictly
//! sequential: line/offset bookkeeping, chunk accumulation and
//! constraint-application order all depend on in-order consumption of the
//! stream. Schema commitment to the target session happens before any data
//! conversion is dispatched — the subcommand drivers enforce that ordering.

use crate::conv::Conv;
use crate::data::{process_copy_block, process_data_row};
use crate::parser::{parser_for, read_and_parse_chunk, SqlDialect};
use crate::reader::Reader;
use crate::schema::{process_statements, CopyOrInsert};
use crate::sink::{NullSink, RowSink};
use crate::target;
use std::io::Read;

/// Process an entire dump stream in the Conv's current mode.
///
/// The only fatal outcomes are I/O errors and an unparsable residue at end
/// of stream; everything else lands in Conv's tallies and diagnostics.
pub fn process_dump<R: Read>(
    conv: &mut Conv,
    reader: &mut Reader<R>,
    dialect: SqlDialect,
    sink: &mut dyn RowSink,
) -> anyhow::Result<()> {
    let parser = parser_for(dialect);
    loop {
        let (_bytes, stmts) = read_and_parse_chunk(conv, reader, parser.as_ref())?;
        match process_statements(conv, &stmts) {
            Some(CopyOrInsert::Copy { table, cols }) => {
                process_copy_block(conv, sink, &table, &cols, reader)?;
            }
            Some(CopyOrInsert::Insert { table, cols, rows }) => {
                for vals in rows {
                    process_data_row(conv, sink, &table, &cols, &vals);
                }
            }
            None => {}
        }
        if reader.eof {
            return Ok(());
        }
    }
}

/// Schema pass: build the source schema from the dump, derive the target
/// schema and finalize primary keys. Returns the bytes consumed.
pub fn schema_pass<R: Read>(
    conv: &mut Conv,
    source: R,
    dialect: SqlDialect,
) -> anyhow::Result<u64> {
    conv.set_schema_mode();
    let mut reader = Reader::new(source);
    let mut sink = NullSink::default();
    process_dump(conv, &mut reader, dialect, &mut sink)?;
    target::build_target_schema(conv);
    conv.add_primary_keys();
    Ok(reader.offset)
}

/// Data pass: re-read the dump in data mode, converting rows into the
/// sink. The target schema must already be committed.
pub fn data_pass<R: Read>(
    conv: &mut Conv,
    source: R,
    dialect: SqlDialect,
    sink: &mut dyn RowSink,
) -> anyhow::Result<u64> {
    conv.set_data_mode();
    let mut reader = Reader::new(source);
    process_dump(conv, &mut reader, dialect, sink)?;
    sink.flush()?;
    Ok(reader.offset)
}
