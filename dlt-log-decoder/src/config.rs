//! Decoder configuration
//!
//! The decoder needs very little tuning: which byte-source backend to
//! read the file through and how many worker threads to fan out to.

use serde::{Deserialize, Serialize};

/// How the capture file is accessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    /// Read the whole file into memory up front (default).
    #[default]
    Precache,
    /// Memory-map the file read-only.
    Mmap,
}

/// Configuration for parsing a capture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Byte-source backend.
    #[serde(default)]
    pub backend: SourceBackend,

    /// Worker thread count. `None` uses hardware concurrency.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl DecoderConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: select the byte-source backend
    pub fn with_backend(mut self, backend: SourceBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Builder method: fix the worker thread count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}
