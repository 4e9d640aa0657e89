//! Chunk decoding task
//!
//! One task owns one byte-source view and decodes records from it until
//! the view is exhausted or its chunk fence is crossed. Corruption
//! markers are deduplicated so a contiguous run of unparseable bytes
//! yields at most one marker.

use crate::record::Record;
use crate::source::ByteSource;
use crate::supervisor::ErrorSlot;
use crate::types::DltError;

pub(crate) struct Task {
    source: ByteSource,
    records: Vec<Record>,
}

impl Task {
    pub(crate) fn new(source: ByteSource) -> Self {
        Self {
            source,
            records: Vec::new(),
        }
    }

    /// Decode this task's chunk. Any fatal error is published to
    /// `errors`; the first writer wins and the other workers stop at
    /// their next loop boundary.
    pub(crate) fn execute(&mut self, errors: &ErrorSlot) {
        let Task { source, records } = self;

        loop {
            // another worker already failed
            if errors.is_set() {
                break;
            }

            let mut on_corrupt = |record: Record| {
                // one marker per run of failures
                if records.last().is_none_or(|last| !last.is_corrupted()) {
                    records.push(record);
                }
            };
            match Record::read_from(source, Some(&mut on_corrupt)) {
                Ok(record) => {
                    records.push(record);
                    if source.overrun() != 0 {
                        // crossed into the next chunk; its owner takes over
                        break;
                    }
                    if source.is_exhausted() {
                        break;
                    }
                }
                Err(DltError::Eof) | Err(DltError::Truncated) => break,
                Err(err) => {
                    log::warn!("chunk worker failed: {err}");
                    errors.publish(err);
                    break;
                }
            }
        }
    }

    pub(crate) fn take_records(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }

    pub(crate) fn overrun(&self) -> u64 {
        self.source.overrun()
    }

    pub(crate) fn first_valid_offset(&self) -> Option<u64> {
        self.source.first_valid_offset()
    }
}
