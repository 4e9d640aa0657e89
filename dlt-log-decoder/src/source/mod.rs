//! Seekable byte-source over a capture file
//!
//! A [`ByteSource`] is one view into the shared backing bytes of a file.
//! [`ByteSource::split`] produces N sibling views over disjoint byte
//! ranges so chunks can be decoded on parallel threads; each view tracks
//! whether a read crossed its chunk fence (`overrun`) and where its first
//! successfully parsed record started (`first_valid_offset`). The
//! supervisor correlates the two to reconcile records that straddle a
//! chunk boundary.
//!
//! Two backings satisfy the same contract: a pre-read buffer and a
//! memory-mapped file.

mod mmap;
mod precache;

use std::path::Path;
use std::sync::Arc;

use crate::types::{DltError, Result};

pub(crate) use mmap::MappedBacking;
pub(crate) use precache::PrecacheBacking;

/// Sentinel `overrun` value: the file itself ended in the middle of a
/// record.
pub const OVERRUN_EOF: u64 = u64::MAX;

/// Shared, immutable backing bytes of an open capture file.
pub(crate) trait FileBacking: Send + Sync {
    fn bytes(&self) -> &[u8];
}

/// One cursor-bearing view over the backing bytes of a capture file.
pub struct ByteSource {
    backing: Arc<dyn FileBacking>,
    pos: u64,
    len: u64,
    /// Last byte this view owns. Reads may run past it (into the next
    /// chunk) but the crossing is recorded in `overrun`. `u64::MAX`
    /// means unbounded.
    chunk_len: u64,
    overrun: u64,
    first_valid_offset: Option<u64>,
}

impl ByteSource {
    /// Open `path` by reading it into memory up front.
    pub fn precache(path: &Path) -> Result<Self> {
        Ok(Self::from_backing(Arc::new(PrecacheBacking::open(path)?)))
    }

    /// Open `path` as a read-only memory mapping.
    pub fn mapped(path: &Path) -> Result<Self> {
        Ok(Self::from_backing(Arc::new(MappedBacking::open(path)?)))
    }

    /// A source over bytes already in memory.
    #[cfg(test)]
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        Self::from_backing(Arc::new(PrecacheBacking::from_vec(bytes)))
    }

    fn from_backing(backing: Arc<dyn FileBacking>) -> Self {
        let len = backing.bytes().len() as u64;
        Self {
            backing,
            pos: 0,
            len,
            chunk_len: u64::MAX,
            overrun: 0,
            first_valid_offset: None,
        }
    }

    /// Next `n` bytes, advancing the cursor.
    ///
    /// A read that crosses the chunk fence but stays within the file
    /// succeeds and records the crossing; a read past the end of the
    /// file fails with [`DltError::Truncated`] and marks the view with
    /// [`OVERRUN_EOF`].
    pub fn read(&mut self, n: usize) -> Result<&[u8]> {
        let new_pos = self.pos + n as u64;
        if new_pos > self.len {
            self.overrun = OVERRUN_EOF;
            return Err(DltError::Truncated);
        }
        if new_pos > self.chunk_len {
            // absolute offset just past the crossing read; the final
            // value is the end of the straddling record, which the next
            // chunk sees as its first valid offset
            self.overrun = new_pos;
        }
        let start = self.pos as usize;
        self.pos = new_pos;
        Ok(&self.backing.bytes()[start..new_pos as usize])
    }

    /// Absolute seek. `pos` must be inside the file.
    pub fn set_pos(&mut self, pos: u64) {
        debug_assert!(pos < self.len);
        self.pos = pos;
    }

    pub fn get_pos(&self) -> u64 {
        self.pos
    }

    /// Total length of the backing file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The cursor consumed every byte of the file.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.len
    }

    pub fn overrun(&self) -> u64 {
        self.overrun
    }

    /// Absolute offset of this view's first successfully parsed record,
    /// `None` until one has been recorded.
    pub fn first_valid_offset(&self) -> Option<u64> {
        self.first_valid_offset
    }

    /// Record a successfully parsed record starting at `offset`.
    ///
    /// The first call pins `first_valid_offset`. Fails with
    /// [`DltError::Eof`] when the view is exhausted, so the caller stops
    /// before the next read turns a clean end of file into a truncation.
    pub fn notify_success(&mut self, offset: u64) -> Result<()> {
        if self.first_valid_offset.is_none() {
            self.first_valid_offset = Some(offset);
        }
        if self.pos == self.len {
            return Err(DltError::Eof);
        }
        Ok(())
    }

    /// Split into `parts` independent views over disjoint ranges.
    ///
    /// View `i` starts at `i * floor(len / parts)`; its fence is one byte
    /// short of the next view's start. The last view owns the file tail
    /// (`chunk_len = len - 1`) so trailing bytes are never unreachable.
    /// Splitting an empty source fails with [`DltError::Eof`].
    pub fn split(&self, parts: usize) -> Result<Vec<ByteSource>> {
        if self.len == 0 {
            // likely an empty file
            return Err(DltError::Eof);
        }

        // never hand out zero-length chunks
        let parts = (parts as u64).clamp(1, self.len);
        let chunk = self.len / parts;

        let views = (0..parts)
            .map(|i| ByteSource {
                backing: Arc::clone(&self.backing),
                pos: chunk * i,
                len: self.len,
                chunk_len: if i + 1 == parts {
                    self.len - 1
                } else {
                    chunk * (i + 1) - 1
                },
                overrun: 0,
                first_valid_offset: None,
            })
            .collect();
        Ok(views)
    }
}
