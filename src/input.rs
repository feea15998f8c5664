//! Dump sources: files (optionally compressed) and spooled stdin.
//!
//! A migration reads the dump twice — once for schema, once for data — and
//! stdin is not restartable, so piped input is spooled to a temp file
//! first. Compression is detected from the file extension and transparently
//! stripped on every open.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Compression format detected from file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor.
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// A re-openable dump source.
pub struct DumpSource {
    path: PathBuf,
    compression: Compression,
    /// Keeps the spooled stdin file alive for the run.
    _spool: Option<tempfile::NamedTempFile>,
}

impl DumpSource {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            anyhow::bail!("input file does not exist: {}", path.display());
        }
        let compression = Compression::from_path(&path);
        Ok(Self {
            path,
            compression,
            _spool: None,
        })
    }

    /// Spool stdin to a temp file so both passes can read it.
    pub fn from_stdin() -> anyhow::Result<Self> {
        let mut spool = tempfile::NamedTempFile::new()?;
        io::copy(&mut io::stdin().lock(), spool.as_file_mut())?;
        Ok(Self {
            path: spool.path().to_path_buf(),
            compression: Compression::None,
            _spool: Some(spool),
        })
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Size of the raw (possibly compressed) input in bytes.
    pub fn raw_len(&self) -> anyhow::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Open a fresh decompressed reader over the dump.
    pub fn open(&self) -> anyhow::Result<Box<dyn Read>> {
        let file = File::open(&self.path)?;
        Ok(self.compression.wrap_reader(Box::new(file))?)
    }

    /// SHA-256 of the raw input, recorded in the report for provenance.
    pub fn sha256(&self) -> anyhow::Result<String> {
        let mut file = File::open(&self.path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    }

    /// First bytes of the decompressed stream, for dialect detection.
    pub fn head(&self, n: usize) -> anyhow::Result<Vec<u8>> {
        let mut reader = self.open()?;
        let mut buf = vec![0u8; n];
        let mut read = 0;
        while read < n {
            match reader.read(&mut buf[read..])? {
                0 => break,
                k => read += k,
            }
        }
        buf.truncate(read);
        Ok(buf)
    }
}
