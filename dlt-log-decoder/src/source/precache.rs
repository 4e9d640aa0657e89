//! Pre-cached file backing
//!
//! Reads the whole capture into memory at construction. The default
//! backend: DLT captures are typically small enough that one up-front
//! read beats page-fault churn during the parallel scan.

use std::fs;
use std::path::Path;

use super::FileBacking;
use crate::types::Result;

pub(crate) struct PrecacheBacking {
    buffer: Vec<u8>,
}

impl PrecacheBacking {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let buffer = fs::read(path)?;
        log::debug!("precached {} bytes from {}", buffer.len(), path.display());
        Ok(Self { buffer })
    }

    #[cfg(test)]
    pub(crate) fn from_vec(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }
}

impl FileBacking for PrecacheBacking {
    fn bytes(&self) -> &[u8] {
        &self.buffer
    }
}
