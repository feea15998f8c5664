//! Line-oriented streaming cursor over a dump byte source.
//!
//! The chunk assembler and the copy-block decoder both consume the dump one
//! raw line at a time; this reader keeps the running line number and byte
//! offset they report errors against. Lines are returned with their
//! terminator intact and are not restartable.

use memchr::memchr;
use std::io::{BufRead, BufReader, Read};

pub const READER_BUFFER_SIZE: usize = 64 * 1024;

/// Streaming line reader with line/offset bookkeeping.
pub struct Reader<R: Read> {
    inner: BufReader<R>,
    /// Number of lines returned so far (1-based after the first read).
    pub line_number: u64,
    /// Byte offset of the position after the last returned line.
    pub offset: u64,
    /// Set once the underlying stream is exhausted.
    pub eof: bool,
}

impl<R: Read> Reader<R> {
    pub fn new(source: R) -> Self {
        Self {
            inner: BufReader::with_capacity(READER_BUFFER_SIZE, source),
            line_number: 0,
            offset: 0,
            eof: false,
        }
    }

    /// Read one raw line, including its `\n` terminator when present.
    ///
    /// Returns an empty slice-equivalent (empty Vec) only at end of stream;
    /// a final line without a trailing newline is returned as-is with `eof`
    /// set. I/O errors surface to the caller — a truncated read mid-dump is
    /// not something the parse loop can recover from.
    pub fn read_line(&mut self) -> std::io::Result<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                self.eof = true;
                break;
            }
            match memchr(b'\n', buf) {
                Some(i) => {
                    line.extend_from_slice(&buf[..=i]);
                    self.inner.consume(i + 1);
                    break;
                }
                None => {
                    line.extend_from_slice(buf);
                    let n = buf.len();
                    self.inner.consume(n);
                }
            }
        }
        if !line.is_empty() {
            self.line_number += 1;
            self.offset += line.len() as u64;
        }
        Ok(line)
    }
}
