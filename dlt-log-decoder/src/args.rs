//! Verbose payload argument formatter
//!
//! A verbose payload is a sequence of self-describing arguments, each
//! introduced by a 4-byte type-info word. The formatter renders all of
//! them into one string, separated by single spaces.

use std::fmt::Write;

use crate::endian::Cursor;
use crate::protocol::type_info;
use crate::types::{DltError, Result};

/// Format `count` arguments from `payload` into a single joined string.
///
/// Arguments are separated by exactly one ASCII space with no trailing
/// separator; zero arguments produce an empty string. Any unknown or
/// unsupported type-info is a parse failure for the whole record.
pub fn format_arguments(payload: &[u8], count: u8, big_endian: bool) -> Result<String> {
    let mut formatter = ArgFormatter {
        cursor: Cursor::new(payload),
        big_endian,
        out: String::new(),
    };
    for i in 0..count {
        if i > 0 {
            formatter.out.push(' ');
        }
        formatter.format_one()?;
    }
    Ok(formatter.out)
}

struct ArgFormatter<'a> {
    cursor: Cursor<'a>,
    big_endian: bool,
    out: String,
}

impl ArgFormatter<'_> {
    fn format_one(&mut self) -> Result<()> {
        let info = self.cursor.extract_u32(self.big_endian)?;

        if info & type_info::STRG != 0 {
            if info & type_info::VARI != 0 {
                return Err(DltError::parse("how could string be variable?"));
            }
            return self.format_string(info & type_info::CODING_MASK);
        }
        if info & type_info::UINT != 0 {
            return self.format_uint(info & type_info::TYLE_MASK, info & type_info::CODING_MASK);
        }
        if info & type_info::SINT != 0 {
            return self.format_sint(info & type_info::TYLE_MASK);
        }
        if info & type_info::FLOA != 0 {
            return self.format_float(info & type_info::TYLE_MASK);
        }
        if info & type_info::BOOL != 0 {
            return self.format_bool();
        }
        if info & type_info::RAWD != 0 {
            return self.format_raw();
        }
        if info
            & (type_info::ARAY
                | type_info::VARI
                | type_info::FIXP
                | type_info::TRAI
                | type_info::STRU)
            != 0
        {
            return Err(DltError::parse("not supported yet"));
        }
        Err(DltError::parse("unknown argument type"))
    }

    /// Length-prefixed string. Only ASCII coding is implemented; the
    /// declared length includes the terminating NUL.
    fn format_string(&mut self, coding: u32) -> Result<()> {
        let len = self.cursor.extract_u16(self.big_endian)? as usize;
        if len == 0 {
            return Err(DltError::parse("INFO_STRG len is 0"));
        }
        match coding {
            type_info::SCOD_ASCII => {
                let bytes = self.cursor.take(len)?;
                if bytes[len - 1] != 0 {
                    return Err(DltError::parse("string is not null-terminated"));
                }
                // the content is copied byte for byte; bytes that cannot
                // land verbatim in the output are a parse failure
                let text = std::str::from_utf8(&bytes[..len - 1])
                    .map_err(|_| DltError::parse("string contains invalid utf-8"))?;
                self.out.push_str(text);
                Ok(())
            }
            type_info::SCOD_UTF8 => Err(DltError::parse("SCOD_UTF8 is not supported yet")),
            _ => Err(DltError::parse("incorrect coding type of string")),
        }
    }

    /// Length-prefixed raw data rendered as uppercase hex, no separator.
    fn format_raw(&mut self) -> Result<()> {
        let len = self.cursor.extract_u16(self.big_endian)? as usize;
        let bytes = self.cursor.take(len)?;
        self.out.reserve(len * 2);
        for byte in bytes {
            let _ = write!(self.out, "{byte:02X}");
        }
        Ok(())
    }

    fn format_uint(&mut self, tyle: u32, coding: u32) -> Result<()> {
        let value = match tyle {
            type_info::TYLE_8BIT => u64::from(self.cursor.extract_u8()?),
            type_info::TYLE_16BIT => u64::from(self.cursor.extract_u16(self.big_endian)?),
            type_info::TYLE_32BIT => u64::from(self.cursor.extract_u32(self.big_endian)?),
            type_info::TYLE_64BIT => self.cursor.extract_u64(self.big_endian)?,
            type_info::TYLE_128BIT => return Err(DltError::parse("not supported yet")),
            _ => return Err(DltError::parse("unknown tyle type")),
        };
        match coding {
            type_info::SCOD_HEX => {
                let _ = write!(self.out, "{value:#x}");
            }
            type_info::SCOD_BIN => {
                let _ = write!(self.out, "{value:#b}");
            }
            _ => {
                let _ = write!(self.out, "{value}");
            }
        }
        Ok(())
    }

    fn format_sint(&mut self, tyle: u32) -> Result<()> {
        let value = match tyle {
            type_info::TYLE_8BIT => i64::from(self.cursor.extract_i8()?),
            type_info::TYLE_16BIT => i64::from(self.cursor.extract_i16(self.big_endian)?),
            type_info::TYLE_32BIT => i64::from(self.cursor.extract_i32(self.big_endian)?),
            type_info::TYLE_64BIT => self.cursor.extract_i64(self.big_endian)?,
            type_info::TYLE_128BIT => return Err(DltError::parse("not supported yet")),
            _ => return Err(DltError::parse("unknown tyle type")),
        };
        let _ = write!(self.out, "{value}");
        Ok(())
    }

    fn format_float(&mut self, tyle: u32) -> Result<()> {
        match tyle {
            type_info::TYLE_32BIT => {
                let value = self.cursor.extract_f32(self.big_endian)?;
                let _ = write!(self.out, "{value}");
            }
            type_info::TYLE_64BIT => {
                let value = self.cursor.extract_f64(self.big_endian)?;
                let _ = write!(self.out, "{value}");
            }
            _ => return Err(DltError::parse("unknown tyle type")),
        }
        Ok(())
    }

    fn format_bool(&mut self) -> Result<()> {
        let value = self.cursor.extract_bool()?;
        let _ = write!(self.out, "{value}");
        Ok(())
    }
}
