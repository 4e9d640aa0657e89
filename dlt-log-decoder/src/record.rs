//! Per-message DLT record decoder
//!
//! Parses one stored message (storage header, standard header, optional
//! extras, optional extended header, payload) and formats its message
//! text. Around the single-message parse sits the resynchronization
//! loop: DLT has no framing other than the `DLT\x01` storage magic, so
//! after any framing mismatch the decoder slides the cursor forward one
//! byte and retries until the next magic aligns.

use std::borrow::Cow;

use chrono::{DateTime, Utc};

use crate::args;
use crate::endian::{self, Cursor};
use crate::protocol::{
    self, htyp, msin, DltExtendedHeader, DltStandardHeader, DltStandardHeaderExtra,
    DltStorageHeader, DLT_ID_SIZE, DLT_PATTERN,
};
use crate::source::ByteSource;
use crate::types::{ControlType, DltError, MessageType, Result, SUBTYPE_UNKNOWN};

/// One decoded DLT message.
///
/// A record with a corruption cause is a marker standing in for a run of
/// unparseable bytes; its other fields hold whatever was read before the
/// failure and carry no meaning.
#[derive(Debug, Clone)]
pub struct Record {
    corruption_cause: Option<String>,

    storage: DltStorageHeader,
    standard: DltStandardHeader,
    extra: DltStandardHeaderExtra,
    extended: DltExtendedHeader,

    big_endian: bool,
    verbose: bool,
    msg_type: MessageType,
    subtype: i8,

    message: String,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            corruption_cause: None,
            storage: DltStorageHeader::default(),
            standard: DltStandardHeader::default(),
            extra: DltStandardHeaderExtra::default(),
            extended: DltExtendedHeader::default(),
            big_endian: false,
            verbose: false,
            msg_type: MessageType::Unknown,
            subtype: SUBTYPE_UNKNOWN,
            message: String::new(),
        }
    }
}

impl Record {
    /// Read the next record from `source`, resynchronizing on framing
    /// errors.
    ///
    /// On a parse failure the partially decoded record is handed to
    /// `on_corrupt` as a corruption marker, then the cursor slides one
    /// byte past the failed attempt and the parse restarts. Truncation
    /// (the file ends inside a record) emits a final marker and
    /// propagates; [`DltError::Eof`] propagates untouched.
    pub fn read_from(
        source: &mut ByteSource,
        mut on_corrupt: Option<&mut dyn FnMut(Record)>,
    ) -> Result<Record> {
        loop {
            let start = source.get_pos();
            let mut record = Record::default();
            match record.parse_from(source) {
                Ok(()) => {
                    // Exhaustion is reported by the task's own check; the
                    // completed record is always handed back.
                    let _ = source.notify_success(start);
                    return Ok(record);
                }
                Err(DltError::Parse(cause)) => {
                    log::trace!("resync at offset {start}: {cause}");
                    if let Some(handler) = on_corrupt.as_deref_mut() {
                        record.corruption_cause = Some(cause);
                        handler(record);
                    }
                    source.set_pos(start + 1);
                }
                Err(DltError::Truncated) => {
                    if let Some(handler) = on_corrupt.as_deref_mut() {
                        record.corruption_cause = Some(DltError::Truncated.to_string());
                        handler(record);
                    }
                    return Err(DltError::Truncated);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Parse a single message starting at the cursor.
    fn parse_from(&mut self, source: &mut ByteSource) -> Result<()> {
        // bytes consumed that count against the wire length (everything
        // after the storage header)
        let mut consumed: u16 = 0;

        let pattern = source.read(4)?;
        if pattern != DLT_PATTERN {
            return Err(DltError::parse("invalid DLT signature"));
        }

        self.storage.seconds = endian::read_u32(source.read(4)?, false);
        self.storage.microseconds = endian::read_u32(source.read(4)?, false);
        self.storage.ecu.copy_from_slice(source.read(DLT_ID_SIZE)?);

        let header = source.read(4)?;
        self.standard.htyp = header[0];
        self.standard.mcnt = header[1];
        // the length field is big-endian on the wire regardless of MSBF
        self.standard.len = endian::read_u16(&header[2..], true);
        consumed += 4;

        let flags = self.standard.htyp;
        self.big_endian = flags & htyp::MSBF != 0;

        if flags & htyp::WEID != 0 {
            self.extra.ecu.copy_from_slice(source.read(DLT_ID_SIZE)?);
            consumed += 4;
        }
        // session id and timestamp ticks are always big-endian on the wire
        if flags & htyp::WSID != 0 {
            self.extra.session_id = endian::read_u32(source.read(4)?, true);
            consumed += 4;
        }
        if flags & htyp::WTMS != 0 {
            self.extra.timestamp = endian::read_u32(source.read(4)?, true);
            consumed += 4;
        }

        if flags & htyp::UEH != 0 {
            let ext = source.read(10)?;
            self.extended.msin = ext[0];
            self.extended.noar = ext[1];
            self.extended.apid.copy_from_slice(&ext[2..6]);
            self.extended.ctid.copy_from_slice(&ext[6..10]);
            consumed += 10;

            self.verbose = self.extended.msin & msin::VERB != 0;
            self.msg_type = MessageType::from_bits((self.extended.msin & msin::MSTP) >> 1);
            self.subtype = ((self.extended.msin & msin::MTIN) >> 4) as i8;
        }

        let payload_len = self
            .standard
            .len
            .checked_sub(consumed)
            .ok_or_else(|| DltError::parse("declared length shorter than headers"))?;
        let payload = source.read(payload_len as usize)?;
        self.assemble_message(payload)
    }

    fn assemble_message(&mut self, payload: &[u8]) -> Result<()> {
        if self.msg_type == MessageType::Control {
            if self.verbose {
                return Err(DltError::parse("verbose control messages are not supported"));
            }
            return self.assemble_control(payload);
        }

        if self.verbose {
            if self.extended.noar > 0 {
                self.message = args::format_arguments(payload, self.extended.noar, self.big_endian)?;
            }
            return Ok(());
        }

        // non-verbose: a bare message id, the rest of the payload is opaque
        let mut cursor = Cursor::new(payload);
        let id = cursor.extract_u32(self.big_endian)?;
        self.message = format!("[{id}]");
        Ok(())
    }

    fn assemble_control(&mut self, payload: &[u8]) -> Result<()> {
        let mut cursor = Cursor::new(payload);
        let service_id = cursor.extract_u32(self.big_endian)?;

        if self.subtype != ControlType::Response as i8 {
            self.message = format!("[{}]", protocol::service_name(service_id));
            return Ok(());
        }

        let return_code = cursor.extract_u8()?;
        if service_id == protocol::SERVICE_MARKER {
            self.message = "MARKER".to_string();
            return Ok(());
        }

        let mut message = format!(
            "[{} {}] ",
            protocol::service_name(service_id),
            protocol::return_code_name(return_code)?
        );
        match service_id {
            protocol::SERVICE_GET_SOFTWARE_VERSION => {
                // the version length is little-endian regardless of MSBF
                let len = cursor.extract_u32(false)? as usize;
                message.push_str(&String::from_utf8_lossy(cursor.take(len)?));
            }
            protocol::SERVICE_CONNECTION_INFO => {
                let status = cursor.extract_u8()?;
                message.push_str(protocol::connection_status_name(status));
                message.push(' ');
                message.push_str(&String::from_utf8_lossy(cursor.take(DLT_ID_SIZE)?));
            }
            protocol::SERVICE_TIMEZONE => {
                let seconds = cursor.extract_u32(false)?;
                message = seconds.to_string();
                if cursor.extract_bool()? {
                    message.push_str("DST");
                }
            }
            _ => {} // no additional data in the payload
        }
        self.message = message;
        Ok(())
    }

    /// Whether this record is a corruption marker.
    pub fn is_corrupted(&self) -> bool {
        self.corruption_cause.is_some()
    }

    /// Parser diagnostic of a corruption marker.
    pub fn corruption_cause(&self) -> Option<&str> {
        self.corruption_cause.as_deref()
    }

    /// Formatted message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Application id from the extended header.
    pub fn apid(&self) -> Cow<'_, str> {
        id4_text(&self.extended.apid)
    }

    /// Context id from the extended header.
    pub fn ctid(&self) -> Cow<'_, str> {
        id4_text(&self.extended.ctid)
    }

    /// Capture wall time in microseconds since the UNIX epoch.
    pub fn timestamp(&self) -> u64 {
        u64::from(self.storage.seconds) * 1_000_000 + u64::from(self.storage.microseconds)
    }

    /// Capture wall time as a UTC timestamp.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(
            i64::from(self.storage.seconds),
            self.storage.microseconds.saturating_mul(1_000),
        )
    }

    /// Ticks since system start in 0.1 milliseconds, from the header
    /// extras.
    pub fn timestamp_extra(&self) -> u32 {
        self.extra.timestamp
    }

    pub fn session_id(&self) -> u32 {
        self.extra.session_id
    }

    pub fn counter(&self) -> u8 {
        self.standard.mcnt
    }

    /// Declared message length from the standard header.
    pub fn wire_len(&self) -> u16 {
        self.standard.len
    }

    pub fn message_type(&self) -> MessageType {
        self.msg_type
    }

    /// Message subtype; semantics depend on the type. -2 when no
    /// extended header was present.
    pub fn subtype(&self) -> i8 {
        self.subtype
    }

    /// Payload byte order declared by the MSBF flag.
    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    /// Protocol version from the top three bits of `htyp`. Not
    /// validated.
    pub fn version(&self) -> u8 {
        (self.standard.htyp & htyp::VERS) >> 5
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// ECU id from the storage header.
    pub fn ecu(&self) -> Cow<'_, str> {
        id4_text(&self.storage.ecu)
    }

    /// ECU id from the header extras, if WEID was set.
    pub fn ecu_extra(&self) -> Cow<'_, str> {
        id4_text(&self.extra.ecu)
    }
}

/// Surface an ID4 field as text, trimmed at the first zero byte from the
/// right.
fn id4_text(field: &[u8; DLT_ID_SIZE]) -> Cow<'_, str> {
    let len = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&field[..len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::type_info;

    /// Assemble one stored message from its parts.
    fn build_message(
        htyp_flags: u8,
        msin_byte: u8,
        noar: u8,
        extras: &[&[u8]],
        payload: &[u8],
    ) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&DLT_PATTERN);
        bytes.extend_from_slice(&100u32.to_le_bytes()); // seconds
        bytes.extend_from_slice(&500u32.to_le_bytes()); // microseconds
        bytes.extend_from_slice(b"ECU1");

        let extras_len: usize = extras.iter().map(|e| e.len()).sum();
        let extended_len = if htyp_flags & htyp::UEH != 0 { 10 } else { 0 };
        let wire_len = (4 + extras_len + extended_len + payload.len()) as u16;

        bytes.push(htyp_flags);
        bytes.push(7); // counter
        bytes.extend_from_slice(&wire_len.to_be_bytes());
        for extra in extras {
            bytes.extend_from_slice(extra);
        }
        if htyp_flags & htyp::UEH != 0 {
            bytes.push(msin_byte);
            bytes.push(noar);
            bytes.extend_from_slice(b"APP1");
            bytes.extend_from_slice(b"CTX1");
        }
        bytes.extend_from_slice(payload);
        bytes
    }

    fn read_one(bytes: Vec<u8>) -> Record {
        let mut source = ByteSource::from_vec(bytes);
        Record::read_from(&mut source, None).unwrap()
    }

    #[test]
    fn test_non_verbose_with_extended_header() {
        // UEH | WEID | WTMS, log/info subtype, non-verbose
        let msin_byte = 4 << 4; // type log, subtype 4, verbose off
        let bytes = build_message(
            htyp::UEH | htyp::WEID | htyp::WTMS,
            msin_byte,
            0,
            &[b"ECU1", &4096u32.to_be_bytes()],
            &0xDEADBEEFu32.to_le_bytes(),
        );
        let record = read_one(bytes);

        assert!(!record.is_corrupted());
        assert_eq!(record.message(), "[3735928559]");
        assert_eq!(record.apid(), "APP1");
        assert_eq!(record.ctid(), "CTX1");
        assert_eq!(record.ecu(), "ECU1");
        assert_eq!(record.ecu_extra(), "ECU1");
        assert_eq!(record.message_type(), MessageType::Log);
        assert_eq!(record.subtype(), 4);
        assert_eq!(record.counter(), 7);
        assert_eq!(record.timestamp_extra(), 4096);
        assert_eq!(record.timestamp(), 100_000_500);
    }

    #[test]
    fn test_minimal_header_is_non_verbose() {
        // no extended header at all
        let bytes = build_message(0, 0, 0, &[], &42u32.to_le_bytes());
        let record = read_one(bytes);
        assert_eq!(record.message(), "[42]");
        assert_eq!(record.message_type(), MessageType::Unknown);
        assert_eq!(record.subtype(), SUBTYPE_UNKNOWN);
        assert_eq!(record.apid(), "");
    }

    #[test]
    fn test_big_endian_payload() {
        let bytes = build_message(htyp::MSBF, 0, 0, &[], &42u32.to_be_bytes());
        let record = read_one(bytes);
        assert!(record.is_big_endian());
        assert_eq!(record.message(), "[42]");
    }

    #[test]
    fn test_session_id_is_wire_big_endian() {
        let bytes = build_message(htyp::WSID, 0, 0, &[&0x11223344u32.to_be_bytes()], &[0; 4]);
        let record = read_one(bytes);
        assert_eq!(record.session_id(), 0x11223344);
    }

    #[test]
    fn test_verbose_single_uint() {
        let mut payload = (type_info::UINT | type_info::TYLE_32BIT).to_le_bytes().to_vec();
        payload.extend_from_slice(&42u32.to_le_bytes());
        let bytes = build_message(htyp::UEH, msin::VERB, 1, &[], &payload);
        let record = read_one(bytes);
        assert!(record.is_verbose());
        assert_eq!(record.message(), "42");
    }

    #[test]
    fn test_verbose_string_argument() {
        let mut payload = (type_info::STRG | type_info::SCOD_ASCII).to_le_bytes().to_vec();
        payload.extend_from_slice(&3u16.to_le_bytes());
        payload.extend_from_slice(b"hi\0");
        let bytes = build_message(htyp::UEH, msin::VERB, 1, &[], &payload);
        assert_eq!(read_one(bytes).message(), "hi");
    }

    #[test]
    fn test_verbose_no_arguments_is_empty() {
        let bytes = build_message(htyp::UEH, msin::VERB, 0, &[], &[]);
        assert_eq!(read_one(bytes).message(), "");
    }

    fn control_msin(subtype: u8) -> u8 {
        (subtype << 4) | ((MessageType::Control.as_i8() as u8) << 1)
    }

    #[test]
    fn test_control_get_software_version() {
        let mut payload = 19u32.to_le_bytes().to_vec();
        payload.push(0); // ok
        payload.extend_from_slice(&3u32.to_le_bytes());
        payload.extend_from_slice(b"v12");
        let bytes = build_message(htyp::UEH, control_msin(2), 0, &[], &payload);
        assert_eq!(read_one(bytes).message(), "[get_software_version ok] v12");
    }

    #[test]
    fn test_control_connection_info() {
        let mut payload = 0x0F02u32.to_le_bytes().to_vec();
        payload.push(0); // ok
        payload.push(2); // connected
        payload.extend_from_slice(b"ECU1");
        let bytes = build_message(htyp::UEH, control_msin(2), 0, &[], &payload);
        assert_eq!(read_one(bytes).message(), "[connection_info ok] connected ECU1");
    }

    #[test]
    fn test_control_timezone() {
        let mut payload = 0x0F03u32.to_le_bytes().to_vec();
        payload.push(0);
        payload.extend_from_slice(&7200u32.to_le_bytes());
        payload.push(1); // dst
        let bytes = build_message(htyp::UEH, control_msin(2), 0, &[], &payload);
        assert_eq!(read_one(bytes).message(), "7200DST");

        let mut payload = 0x0F03u32.to_le_bytes().to_vec();
        payload.push(0);
        payload.extend_from_slice(&7200u32.to_le_bytes());
        payload.push(0);
        let bytes = build_message(htyp::UEH, control_msin(2), 0, &[], &payload);
        assert_eq!(read_one(bytes).message(), "7200");
    }

    #[test]
    fn test_control_marker() {
        let mut payload = 0x0F04u32.to_le_bytes().to_vec();
        payload.push(0);
        let bytes = build_message(htyp::UEH, control_msin(2), 0, &[], &payload);
        assert_eq!(read_one(bytes).message(), "MARKER");
    }

    #[test]
    fn test_control_request_has_name_only() {
        let payload = 1u32.to_le_bytes().to_vec();
        let bytes = build_message(htyp::UEH, control_msin(1), 0, &[], &payload);
        assert_eq!(read_one(bytes).message(), "[set_log_level]");
    }

    #[test]
    fn test_control_unknown_service() {
        let payload = 999u32.to_le_bytes().to_vec();
        let bytes = build_message(htyp::UEH, control_msin(1), 0, &[], &payload);
        assert_eq!(read_one(bytes).message(), "[service(999)]");
    }

    #[test]
    fn test_control_invalid_return_code_is_corrupt() {
        let mut payload = 1u32.to_le_bytes().to_vec();
        payload.push(42); // past the return-code table
        let bytes = build_message(htyp::UEH, control_msin(2), 0, &[], &payload);
        let mut source = ByteSource::from_vec(bytes);
        let mut markers = Vec::new();
        let mut on_corrupt = |record: Record| markers.push(record);
        // the slide never finds another magic, so the read ends truncated
        assert!(Record::read_from(&mut source, Some(&mut on_corrupt)).is_err());
        assert!(markers[0].is_corrupted());
        assert_eq!(markers[0].corruption_cause(), Some("invalid control return code"));
    }

    #[test]
    fn test_verbose_control_is_rejected() {
        let payload = 1u32.to_le_bytes().to_vec();
        let bytes = build_message(htyp::UEH, control_msin(1) | msin::VERB, 0, &[], &payload);
        let mut source = ByteSource::from_vec(bytes);
        let mut causes = Vec::new();
        let mut on_corrupt = |record: Record| {
            causes.push(record.corruption_cause().unwrap_or_default().to_string());
        };
        assert!(Record::read_from(&mut source, Some(&mut on_corrupt)).is_err());
        assert_eq!(causes[0], "verbose control messages are not supported");
    }

    #[test]
    fn test_resync_skips_garbage_prefix() {
        let mut bytes = vec![0xFF, 0x00, 0x12];
        bytes.extend_from_slice(&build_message(0, 0, 0, &[], &42u32.to_le_bytes()));
        let mut source = ByteSource::from_vec(bytes);
        let mut markers = 0usize;
        let mut on_corrupt = |_: Record| markers += 1;
        let record = Record::read_from(&mut source, Some(&mut on_corrupt)).unwrap();
        assert_eq!(record.message(), "[42]");
        // one marker per failed attempt; the task dedups adjacent ones
        assert!(markers >= 1);
    }

    #[test]
    fn test_wire_length_shorter_than_headers() {
        let mut bytes = build_message(htyp::UEH, 0, 0, &[], &[0; 4]);
        // overwrite the big-endian length with a value below the header size
        bytes[18] = 0;
        bytes[19] = 2;
        let mut source = ByteSource::from_vec(bytes);
        let mut causes = Vec::new();
        let mut on_corrupt = |record: Record| {
            causes.push(record.corruption_cause().unwrap_or_default().to_string());
        };
        let _ = Record::read_from(&mut source, Some(&mut on_corrupt));
        assert_eq!(causes[0], "declared length shorter than headers");
    }

    #[test]
    fn test_id4_trimming() {
        assert_eq!(id4_text(b"ECU1"), "ECU1");
        assert_eq!(id4_text(&[b'E', b'C', 0, 0]), "EC");
        assert_eq!(id4_text(&[0, 0, 0, 0]), "");
        // interior zero survives a right trim
        assert_eq!(id4_text(&[b'A', 0, b'B', 0]), "A\u{0}B");
    }
}
