//! The `record` module defines the [`Record`] and [`RecordType`] which are used for parsing
//! (and generating) single Intel HEX records.

use crate::error::IspnubErrorKind;
use std::fmt::Write;

mod sizes {
    pub const BYTE_CHAR_LEN: usize = 2;
    pub const SMALLEST_RECORD: usize = (1 + 2 + 1 + 1) * BYTE_CHAR_LEN; // len + addr + rtype + checksum
    pub const LARGEST_RECORD: usize = SMALLEST_RECORD + 255 * BYTE_CHAR_LEN;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    Data,
    EndOfFile,
    ExtendedSegmentAddress,
    ExtendedLinearAddress,
    /// Any record type this tool does not interpret (start address records, vendor types)
    Other(u8),
}

impl From<u8> for RecordType {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::Data,
            0x01 => Self::EndOfFile,
            0x02 => Self::ExtendedSegmentAddress,
            0x04 => Self::ExtendedLinearAddress,
            other => Self::Other(other),
        }
    }
}

impl RecordType {
    /// Record type byte as it appears on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Data => 0x00,
            Self::EndOfFile => 0x01,
            Self::ExtendedSegmentAddress => 0x02,
            Self::ExtendedLinearAddress => 0x04,
            Self::Other(code) => code,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Record {
    pub length: u8,
    pub address: u16,
    pub rtype: RecordType,
    pub data: Vec<u8>,
    pub checksum: u8,
}

impl Record {
    /// Two's complement of the byte sum, i.e. the value that brings the sum to zero.
    #[must_use]
    pub fn calculate_checksum(data: &[u8]) -> u8 {
        let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        (!sum).wrapping_add(1)
    }

    /// 16-bit value carried by an extended address record.
    #[must_use]
    pub fn address_value(&self) -> Option<u16> {
        <[u8; 2]>::try_from(self.data.as_slice())
            .ok()
            .map(u16::from_be_bytes)
    }

    /// Create the record string from address, type and data slice.
    /// Hex digits are uppercase.
    ///
    /// # Errors
    /// Returns an error if the payload does not fit into a single record.
    ///
    /// # Example
    /// ```
    /// use ispnublib::{Record, RecordType};
    ///
    /// let record = Record::create(0, RecordType::ExtendedLinearAddress, &[0x00, 0x01]).unwrap();
    /// assert_eq!(record, ":020000040001F9");
    /// ```
    #[allow(clippy::cast_possible_truncation)]
    pub fn create(address: u16, rtype: RecordType, data: &[u8]) -> Result<String, IspnubErrorKind> {
        if data.len() > u8::MAX as usize {
            return Err(IspnubErrorKind::RecordTooLong);
        }

        let [addr_high, addr_low] = address.to_be_bytes();
        let mut header = vec![data.len() as u8, addr_high, addr_low, rtype.code()];

        let mut record = String::with_capacity(sizes::SMALLEST_RECORD + 1 + data.len() * 2);
        record.push(':');
        for b in &header {
            let _ = write!(record, "{b:02X}");
        }
        for b in data {
            let _ = write!(record, "{b:02X}");
        }

        header.extend_from_slice(data);
        let _ = write!(record, "{:02X}", Self::calculate_checksum(&header));

        Ok(record)
    }

    /// Parse the record string into a `Record`.
    /// Trailing whitespace (e.g. `\r`) is expected to be stripped by the caller.
    ///
    /// # Errors
    /// Returns an error if the line is not a well-formed record or its checksum is wrong.
    pub fn parse(line: &str) -> Result<Self, IspnubErrorKind> {
        let Some(hexdigit_part) = line.strip_prefix(':') else {
            return Err(IspnubErrorKind::MissingStartCode);
        };

        // Validate all characters are hexadecimal
        if !hexdigit_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IspnubErrorKind::ContainsInvalidCharacters);
        }

        // Validate record's size
        let hexdigit_part_len = hexdigit_part.len();
        if hexdigit_part_len < sizes::SMALLEST_RECORD {
            return Err(IspnubErrorKind::RecordTooShort);
        } else if hexdigit_part_len > sizes::LARGEST_RECORD {
            return Err(IspnubErrorKind::RecordTooLong);
        } else if hexdigit_part_len % sizes::BYTE_CHAR_LEN != 0 {
            return Err(IspnubErrorKind::RecordNotEvenLength);
        }

        let bytes = (0..hexdigit_part_len)
            .step_by(sizes::BYTE_CHAR_LEN)
            .map(|i| u8::from_str_radix(&hexdigit_part[i..i + sizes::BYTE_CHAR_LEN], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| IspnubErrorKind::ContainsInvalidCharacters)?;

        // Length byte has to match the number of bytes that follow
        let length = bytes[0];
        if bytes.len() != length as usize + 5 {
            return Err(IspnubErrorKind::RecordInvalidPayloadLength);
        }

        let (body, checksum) = bytes.split_at(bytes.len() - 1);
        let checksum = checksum[0];
        let expected = Self::calculate_checksum(body);
        if expected != checksum {
            return Err(IspnubErrorKind::RecordChecksumMismatch(expected, checksum));
        }

        let rtype = RecordType::from(body[3]);
        if matches!(
            rtype,
            RecordType::ExtendedSegmentAddress | RecordType::ExtendedLinearAddress
        ) && length != 2
        {
            return Err(IspnubErrorKind::RecordInvalidAddressLength(length as usize));
        }

        Ok(Self {
            length,
            address: u16::from_be_bytes([body[1], body[2]]),
            rtype,
            data: body[4..].to_vec(),
            checksum,
        })
    }
}
