//! Core types for the DLT decoder library
//!
//! Defines the error type shared by every layer of the decoder and the
//! small enums derived from the extended-header info byte. The decoder
//! only reports what a message claims about itself - it does not filter
//! or reinterpret types it does not know.

use std::fmt;
use std::path::PathBuf;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DltError>;

/// Errors that can occur while decoding a DLT capture
#[derive(Debug, thiserror::Error)]
pub enum DltError {
    /// The cursor reached the end of the data. Normal terminal condition
    /// for a chunk worker, never surfaced to the caller of the adapter.
    #[error("end of data")]
    Eof,

    /// A read would pass the end of the file in the middle of a record.
    /// Terminal like `Eof`, but the worker emits a final corruption
    /// marker carrying this description first.
    #[error("file ended with incomplete record")]
    Truncated,

    /// A framing mismatch: bad magic, bad argument type, bad string
    /// length and so on. Recoverable - the decoder slides one byte
    /// forward and retries until the next storage magic aligns.
    #[error("{0}")]
    Parse(String),

    #[error("DLT file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DltError {
    /// Shorthand for a parse failure with a formatted cause.
    pub(crate) fn parse(cause: impl Into<String>) -> Self {
        DltError::Parse(cause.into())
    }
}

/// Type of a DLT message, from bits 1-3 of the extended-header info byte.
///
/// Messages without an extended header have no declared type and report
/// `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageType {
    #[default]
    Unknown,
    Log,
    AppTrace,
    NwTrace,
    Control,
}

impl MessageType {
    /// Map the 3-bit type field. Values outside the defined range stay
    /// `Unknown`.
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits {
            0 => MessageType::Log,
            1 => MessageType::AppTrace,
            2 => MessageType::NwTrace,
            3 => MessageType::Control,
            _ => MessageType::Unknown,
        }
    }

    /// Numeric form of the type: 0-3, or -2 for `Unknown`.
    pub fn as_i8(self) -> i8 {
        match self {
            MessageType::Unknown => -2,
            MessageType::Log => 0,
            MessageType::AppTrace => 1,
            MessageType::NwTrace => 2,
            MessageType::Control => 3,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Unknown => write!(f, "unknown"),
            MessageType::Log => write!(f, "log"),
            MessageType::AppTrace => write!(f, "app_trace"),
            MessageType::NwTrace => write!(f, "nw_trace"),
            MessageType::Control => write!(f, "control"),
        }
    }
}

/// Subtype of a control message (type info bits 4-7 when the type is
/// `Control`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum ControlType {
    Request = 1,
    Response = 2,
    Time = 3,
}

/// Subtype value of a record whose extended header was never read.
pub const SUBTYPE_UNKNOWN: i8 = -2;
