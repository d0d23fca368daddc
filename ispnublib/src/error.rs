//! The `error` module defines the [`IspnubError`] enum that describes the errors that
//! can occur while decoding Intel HEX images or compiling an ISP script.
//! It carries three pieces of information:
//! 1. Where the error occurs, e.g., in a hex record, in a script line, or while writing output.
//! 2. What kind of error was encountered (via [`IspnubErrorKind`]).
//! 3. The line number (if applicable) at which parsing failed.
//!
//! Every error here is fatal. Unknown record types and unknown script commands are only
//! warnings and go through the `log` facade instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IspnubError {
    #[error("Error encountered during record parsing at line #{1} of the hex file:\n{0}")]
    HexRecord(IspnubErrorKind, usize),

    #[error("Error encountered during parsing at line #{1} of the script:\n{0}")]
    Script(IspnubErrorKind, usize),

    #[error(
        "Address 0x{address:X} is outside of the memory image (capacity 0x{capacity:X}) at line #{line}"
    )]
    Capacity {
        address: usize,
        capacity: usize,
        line: usize,
    },

    #[error("Failed to access file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IspnubError {
    /// Returns the kind of a format error, `None` for capacity and I/O errors.
    #[must_use]
    pub const fn kind(&self) -> Option<&IspnubErrorKind> {
        match self {
            Self::HexRecord(kind, _) | Self::Script(kind, _) => Some(kind),
            Self::Capacity { .. } | Self::Io { .. } => None,
        }
    }

    /// Returns the 1-based line number the error refers to, if any.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::HexRecord(_, line) | Self::Script(_, line) | Self::Capacity { line, .. } => {
                Some(*line)
            }
            Self::Io { .. } => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IspnubErrorKind {
    /// Record does not begin with a ':'
    #[error("Missing start code ':'")]
    MissingStartCode,
    /// Record contains non-hexadecimal characters
    #[error("Record contains invalid character(s)")]
    ContainsInvalidCharacters,
    /// Record is shorter than the smallest valid
    #[error("Record too short")]
    RecordTooShort,
    /// Record is longer than the largest valid
    #[error("Record too long")]
    RecordTooLong,
    /// Record length is odd
    #[error("Record with uneven length")]
    RecordNotEvenLength,
    /// Number of payload characters differs from the record's length byte
    #[error("Payload (data bytes) size differs from record's length")]
    RecordInvalidPayloadLength,
    /// Address record does not carry exactly two payload bytes
    #[error("Address record must carry 2 data bytes, found {0}")]
    RecordInvalidAddressLength(usize),
    /// Record checksum mismatch
    #[error("Invalid record checksum - expected: 0x{0:02X}, found: 0x{1:02X}")]
    RecordChecksumMismatch(u8, u8),
    /// Script parameter is not a decimal or `0x`-prefixed hexadecimal integer
    #[error("Invalid integer value '{0}'")]
    InvalidInteger(String),
    /// Script command is missing a required parameter
    #[error("Command {command} expects {expected} parameter(s), found {found}")]
    MissingParameter {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    /// Script parameter that must not be empty is empty
    #[error("Command {0} has an empty file name")]
    EmptyFileName(&'static str),
}
