//! The `image` module provides the [`MemoryImage`] struct, a fixed-capacity flat byte buffer
//! that stands for a controller or target address space.
//!
//! Intel HEX text is decoded straight into the buffer (honouring extended segment and
//! extended linear address records) and encoded back from it. Unprogrammed cells hold
//! [`BLANK`]; 16-byte chunks consisting only of blank cells are left out of the output.

use crate::blocks::DataBlocks;
use crate::config::BLANK;
use crate::error::IspnubError;
use crate::record::{Record, RecordType};
use std::io::Write;
use std::path::Path;

/// Maximum payload size of emitted data records.
const MAX_PAYLOAD_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    buffer: Vec<u8>,
}

impl AsRef<[u8]> for MemoryImage {
    fn as_ref(&self) -> &[u8] {
        &self.buffer
    }
}

impl MemoryImage {
    /// Creates a blank-filled image of the given capacity.
    ///
    /// # Examples
    /// ```
    /// use ispnublib::MemoryImage;
    ///
    /// let image = MemoryImage::new(0x100);
    /// assert_eq!(image.capacity(), 0x100);
    /// assert!(image.as_slice().iter().all(|b| *b == 0xFF));
    /// ```
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![BLANK; capacity],
        }
    }

    /// Creates a blank-filled image and decodes the provided hex file into it at offset 0.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is malformed, or does not fit.
    pub fn from_hex<P: AsRef<Path>>(filepath: P, capacity: usize) -> Result<Self, IspnubError> {
        let mut image = Self::new(capacity);
        image.load_hex(filepath, 0)?;
        Ok(image)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Iterator over the contiguous non-blank regions of `[0, length)`.
    #[must_use]
    pub fn blocks(&self, length: usize, bound: usize) -> DataBlocks<'_> {
        DataBlocks::new(&self.buffer, length, bound)
    }

    /// Decodes the provided hex file into the image, shifted by `offset`.
    /// Returns the end address of the decoded data, see [`MemoryImage::parse`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is malformed, or does not fit.
    pub fn load_hex<P: AsRef<Path>>(
        &mut self,
        filepath: P,
        offset: usize,
    ) -> Result<usize, IspnubError> {
        let text = std::fs::read_to_string(&filepath)
            .map_err(|err| IspnubError::io(filepath.as_ref(), err))?;

        self.parse(&text, offset)
    }

    /// Decodes Intel HEX text into the image.
    ///
    /// Every data byte lands at `offset + address + extended linear + extended segment`.
    /// Returns one past the highest address written, not counting `offset`, or 0 if the
    /// text holds no data records.
    ///
    /// # Errors
    /// - Returns an error if a record is malformed or its checksum is wrong
    /// - Returns an error if a data byte falls outside of the image
    ///
    /// # Example
    /// ```
    /// use ispnublib::MemoryImage;
    ///
    /// let mut image = MemoryImage::new(0x20);
    /// let end = image.parse(":040000000011223396\n:00000001FF\n", 0).unwrap();
    ///
    /// assert_eq!(end, 4);
    /// assert_eq!(&image.as_slice()[..5], &[0x00, 0x11, 0x22, 0x33, 0xFF]);
    /// ```
    pub fn parse(&mut self, text: &str, offset: usize) -> Result<usize, IspnubError> {
        let mut extended_address: usize = 0;
        let mut segment_address: usize = 0;
        let mut max_address: Option<usize> = None;

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim_end();

            if line.is_empty() {
                continue;
            }

            let record =
                Record::parse(line).map_err(|err| IspnubError::HexRecord(err, line_no))?;

            match record.rtype {
                RecordType::Data => {
                    let base = record.address as usize + extended_address + segment_address;
                    for (i, byte) in record.data.iter().enumerate() {
                        let address = base + i;
                        let capacity = self.buffer.len();
                        let cell = self.buffer.get_mut(offset + address).ok_or_else(|| {
                            IspnubError::Capacity {
                                address: offset + address,
                                capacity,
                                line: line_no,
                            }
                        })?;
                        *cell = *byte;
                    }
                    if !record.data.is_empty() {
                        let last = base + record.data.len() - 1;
                        max_address = Some(max_address.map_or(last, |max| max.max(last)));
                    }
                }
                RecordType::EndOfFile => {}
                RecordType::ExtendedSegmentAddress => {
                    segment_address = record.address_value().map_or(0, usize::from) << 4;
                }
                RecordType::ExtendedLinearAddress => {
                    extended_address = record.address_value().map_or(0, usize::from) << 16;
                }
                RecordType::Other(code) => {
                    log::warn!("Unknown record type 0x{code:02X} in line {line_no}, skipped");
                }
            }
        }

        Ok(max_address.map_or(0, |max| max + 1))
    }

    #[allow(clippy::cast_possible_truncation)]
    /// Encodes `[0, length)` of the image as Intel HEX text.
    ///
    /// Data goes out in 16-byte records in ascending address order. An extended linear
    /// address record precedes the first chunk of every new 64 KiB window. Chunks made up
    /// of blank cells only are skipped. The output always ends with an end-of-file record.
    ///
    /// # Errors
    /// Returns an error if the writer fails.
    pub fn encode<W: Write>(&self, writer: &mut W, length: usize) -> std::io::Result<()> {
        let length = length.min(self.buffer.len());
        let mut upper_address = 0;

        for (index, chunk) in self.buffer[..length].chunks(MAX_PAYLOAD_SIZE).enumerate() {
            let position = index * MAX_PAYLOAD_SIZE;

            // Entering a new 64 KiB window -> emit ELA
            if position >> 16 != upper_address {
                upper_address = position >> 16;
                let value = (upper_address as u16).to_be_bytes();
                let record = Record::create(0, RecordType::ExtendedLinearAddress, &value)
                    .map_err(std::io::Error::other)?;
                writeln!(writer, "{record}")?;
            }

            if chunk.iter().all(|b| *b == BLANK) {
                continue;
            }

            let record = Record::create((position & 0xFFFF) as u16, RecordType::Data, chunk)
                .map_err(std::io::Error::other)?;
            writeln!(writer, "{record}")?;
        }

        let record =
            Record::create(0, RecordType::EndOfFile, &[]).map_err(std::io::Error::other)?;
        writeln!(writer, "{record}")
    }

    /// Encodes `[0, length)` of the image into a string, see [`MemoryImage::encode`].
    ///
    /// # Example
    /// ```
    /// use ispnublib::MemoryImage;
    ///
    /// let image = MemoryImage::new(0x40);
    /// assert_eq!(image.to_hex_string(0x40), ":00000001FF\n");
    /// ```
    #[must_use]
    pub fn to_hex_string(&self, length: usize) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.encode(&mut out, length);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Writes `[0, length)` of the image as an Intel HEX file at the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_hex<P: AsRef<Path>>(&self, filepath: P, length: usize) -> Result<(), IspnubError> {
        let path = filepath.as_ref();
        let to_err = |err| IspnubError::io(path, err);

        // Ensure the parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(to_err)?;
        }

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(to_err)?;

        // Wrap in BufWriter for efficient line-by-line writing
        let mut writer = std::io::BufWriter::new(file);
        self.encode(&mut writer, length).map_err(to_err)?;
        writer.flush().map_err(to_err)
    }
}
