//! DLT Log Decoder Library
//!
//! A decoder for AUTOSAR Diagnostic Log and Trace (DLT) capture files.
//! A capture is a dense concatenation of binary messages with no
//! delimiter other than the `DLT\x01` storage magic; this library
//! partitions the file into chunks, decodes them on parallel threads,
//! recovers from framing corruption by byte-wise resynchronization and
//! reconciles records that straddle chunk boundaries into one contiguous
//! record vector.
//!
//! # Architecture
//!
//! - Per-message decoding: storage/standard/extended headers, verbose
//!   argument formatting, control-service formatting
//! - Parallel chunked reading: one worker per chunk, boundary
//!   reconciliation in the supervisor
//! - Corruption handling: a run of unparseable bytes becomes one marker
//!   record carrying the parser diagnostic
//!
//! The library does NOT evaluate, filter or export records; presentation
//! is the application layer's concern (dlt-log-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use dlt_log_decoder::DltFile;
//!
//! let file = DltFile::parse("trace.dlt").unwrap();
//! for record in file.records() {
//!     if record.is_corrupted() {
//!         eprintln!("corrupt run: {}", record.corruption_cause().unwrap_or(""));
//!     } else {
//!         println!("{} {} {}", record.apid(), record.ctid(), record.message());
//!     }
//! }
//! ```

// Public modules
pub mod config;
pub mod source;
pub mod types;

// Re-export main types for convenience
pub use config::{DecoderConfig, SourceBackend};
pub use dlt_file::DltFile;
pub use record::Record;
pub use types::{ControlType, DltError, MessageType, Result};

// Internal structure of the decoder pipeline
mod args;
mod dlt_file;
mod endian;
mod protocol;
mod record;
mod supervisor;
mod task;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
