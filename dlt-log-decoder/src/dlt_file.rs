//! Parsed capture file
//!
//! The outward interface of the decoder: open a capture, run the
//! parallel parse, hold the resulting record vector and expose indexed
//! access.

use std::path::Path;

use crate::config::{DecoderConfig, SourceBackend};
use crate::record::Record;
use crate::source::ByteSource;
use crate::supervisor::{self, Supervisor};
use crate::types::{DltError, Result};

/// A fully parsed DLT capture file.
pub struct DltFile {
    records: Vec<Record>,
}

/// Boundary reconciliation requires every chunk to span at least one
/// whole record; small files decode on fewer threads than requested.
const MIN_CHUNK_LEN: u64 = 256;

impl DltFile {
    /// Parse `path` with the default configuration.
    ///
    /// A missing file is an error; an empty file parses to zero records.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse_with(path, DecoderConfig::default())
    }

    /// Parse `path` with an explicit configuration.
    pub fn parse_with(path: impl AsRef<Path>, config: DecoderConfig) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DltError::FileNotFound(path.to_path_buf()));
        }

        log::info!("parsing DLT file: {}", path.display());
        let source = match config.backend {
            SourceBackend::Precache => ByteSource::precache(path)?,
            SourceBackend::Mmap => ByteSource::mapped(path)?,
        };
        let requested = config.threads.unwrap_or_else(supervisor::default_threads).max(1);
        let usable = usize::try_from(source.len() / MIN_CHUNK_LEN)
            .unwrap_or(usize::MAX)
            .max(1);
        let threads = requested.min(usable);
        if threads < requested {
            log::debug!("file too small for {requested} chunks, using {threads}");
        }

        let records = match Supervisor::new(&source, threads) {
            Ok(sup) => sup.execute()?,
            Err(DltError::Eof) => {
                log::debug!("empty DLT file: {}", path.display());
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        log::info!("parsed {} records from {}", records.len(), path.display());
        Ok(Self { records })
    }

    /// Number of decoded records, corruption markers included.
    pub fn records_num(&self) -> usize {
        self.records.len()
    }

    /// Record at `index`, if in range.
    pub fn get_record(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// All records in file order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}
