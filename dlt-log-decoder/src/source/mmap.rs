//! Memory-mapped file backing
//!
//! The mapping owns the bytes; views share it read-only for the lifetime
//! of the parse.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use super::FileBacking;
use crate::types::Result;

pub(crate) struct MappedBacking {
    map: Mmap,
}

impl MappedBacking {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the mapping is read-only; mutating the file while it is
        // mapped is undefined behavior, as with any mmap-backed reader.
        let map = unsafe { Mmap::map(&file)? };
        log::debug!("mapped {} bytes from {}", map.len(), path.display());
        Ok(Self { map })
    }
}

impl FileBacking for MappedBacking {
    fn bytes(&self) -> &[u8] {
        &self.map
    }
}
