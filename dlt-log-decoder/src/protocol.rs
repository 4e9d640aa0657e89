//! DLT wire-format constants
//!
//! Conformance layer with the AUTOSAR DLT storage format: header layouts,
//! the flag masks of the standard and extended headers, verbose-payload
//! type-info encoding, and the control-service tables.

use crate::types::{DltError, Result};

/// Size of the ECU / application / context id fields.
pub const DLT_ID_SIZE: usize = 4;

/// Four-byte identifier, NUL-padded on the wire.
pub type Id4 = [u8; DLT_ID_SIZE];

/// Storage magic preceding every stored message.
pub const DLT_PATTERN: [u8; 4] = [b'D', b'L', b'T', 0x01];

/// `htyp` flags of the standard header.
pub mod htyp {
    /// Use extended header
    pub const UEH: u8 = 0x01;
    /// Most significant byte first (payload is big-endian)
    pub const MSBF: u8 = 0x02;
    /// With ECU id
    pub const WEID: u8 = 0x04;
    /// With session id
    pub const WSID: u8 = 0x08;
    /// With timestamp
    pub const WTMS: u8 = 0x10;
    /// Version number, top three bits
    pub const VERS: u8 = 0xE0;
}

/// `msin` fields of the extended header.
pub mod msin {
    /// Verbose flag
    pub const VERB: u8 = 0x01;
    /// Message type, bits 1-3
    pub const MSTP: u8 = 0x0E;
    /// Message type info (subtype), bits 4-7
    pub const MTIN: u8 = 0xF0;
}

/// DLT file storage header, written before each stored message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DltStorageHeader {
    /// Seconds since 1.1.1970
    pub seconds: u32,
    /// Microseconds
    pub microseconds: u32,
    /// Capture-side ECU id
    pub ecu: Id4,
}

/// DLT standard header, present in every message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DltStandardHeader {
    pub htyp: u8,
    /// Message counter, incremented by the sender
    pub mcnt: u8,
    /// Length of the message without the storage header, big-endian on
    /// the wire
    pub len: u16,
}

/// Optional standard-header fields, each gated by an `htyp` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DltStandardHeaderExtra {
    pub ecu: Id4,
    pub session_id: u32,
    /// Ticks since system start in 0.1 milliseconds
    pub timestamp: u32,
}

/// DLT extended header, present when `htyp` has UEH set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DltExtendedHeader {
    pub msin: u8,
    /// Number of verbose arguments
    pub noar: u8,
    pub apid: Id4,
    pub ctid: Id4,
}

/// Type-info word encoding of a verbose argument.
pub mod type_info {
    pub const BOOL: u32 = 0x0000_0010;
    pub const SINT: u32 = 0x0000_0020;
    pub const UINT: u32 = 0x0000_0040;
    pub const FLOA: u32 = 0x0000_0080;
    pub const ARAY: u32 = 0x0000_0100;
    pub const STRG: u32 = 0x0000_0200;
    pub const RAWD: u32 = 0x0000_0400;
    pub const VARI: u32 = 0x0000_0800;
    pub const FIXP: u32 = 0x0000_1000;
    pub const TRAI: u32 = 0x0000_2000;
    pub const STRU: u32 = 0x0000_4000;

    /// Width nibble
    pub const TYLE_MASK: u32 = 0x0000_000F;
    pub const TYLE_8BIT: u32 = 1;
    pub const TYLE_16BIT: u32 = 2;
    pub const TYLE_32BIT: u32 = 3;
    pub const TYLE_64BIT: u32 = 4;
    pub const TYLE_128BIT: u32 = 5;

    /// String / integer coding field, bits 15-17
    pub const CODING_MASK: u32 = 0x0003_8000;
    pub const SCOD_ASCII: u32 = 0x0000_0000;
    pub const SCOD_UTF8: u32 = 0x0000_8000;
    pub const SCOD_HEX: u32 = 0x0001_0000;
    pub const SCOD_BIN: u32 = 0x0001_8000;
}

/// Control service: get software version.
pub const SERVICE_GET_SOFTWARE_VERSION: u32 = 19;
/// Control service: connection info.
pub const SERVICE_CONNECTION_INFO: u32 = 0x0F02;
/// Control service: timezone.
pub const SERVICE_TIMEZONE: u32 = 0x0F03;
/// Control service: marker.
pub const SERVICE_MARKER: u32 = 0x0F04;

/// Names of the standardized control services, ids 1-20.
const SERVICE_NAMES: [&str; 20] = [
    "set_log_level",
    "set_trace_status",
    "get_log_info",
    "get_default_log_level",
    "store_config",
    "reset_to_factory_default",
    "set_com_interface_status",
    "set_com_interface_max_bandwidth",
    "set_verbose_mode",
    "set_message_filtering",
    "set_timing_packets",
    "get_local_time",
    "use_ecu_id",
    "use_session_id",
    "use_timestamp",
    "use_extended_header",
    "set_default_log_level",
    "set_default_trace_status",
    "get_software_version",
    "message_buffer_overflow",
];

/// Name of a control service id. Ids outside 1-20 format as
/// `service(<decimal>)`.
pub fn service_name(id: u32) -> String {
    match id {
        1..=20 => SERVICE_NAMES[(id - 1) as usize].to_string(),
        _ => format!("service({id})"),
    }
}

const RETURN_CODE_NAMES: [&str; 9] = [
    "ok",
    "not_supported",
    "error",
    "3",
    "4",
    "5",
    "6",
    "7",
    "no_matching_context_id",
];

/// Name of a control response return code. Codes past the table are a
/// parse failure.
pub fn return_code_name(code: u8) -> Result<&'static str> {
    RETURN_CODE_NAMES
        .get(code as usize)
        .copied()
        .ok_or_else(|| DltError::parse("invalid control return code"))
}

/// Connection status carried by a CONNECTION_INFO response.
pub fn connection_status_name(status: u8) -> &'static str {
    match status {
        1 => "disconnected",
        2 => "connected",
        _ => "unknown",
    }
}
