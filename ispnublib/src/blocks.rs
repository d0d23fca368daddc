//! The `blocks` module splits a flat memory image into contiguous regions worth programming.
//!
//! A region ([`DataBlock`]) starts at a non-blank byte and ends at the last non-blank byte
//! before a run of more than `bound` blank bytes. Shorter blank gaps stay inside the region,
//! so a sparse image turns into a few large writes instead of many small ones.

use crate::config::BLANK;
use std::iter::FusedIterator;
use std::ops::RangeInclusive;

/// Contiguous region of an image, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlock {
    pub first: usize,
    pub last: usize,
}

impl DataBlock {
    /// Number of bytes covered by the block.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.last - self.first + 1
    }

    #[must_use]
    pub const fn range(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Iterator over the [`DataBlock`]s of an image, in ascending address order.
///
/// # Example
/// ```
/// use ispnublib::{DataBlock, DataBlocks};
///
/// let mut image = [0xFF; 32];
/// image[2] = 0x01;
/// image[4] = 0x02;
/// image[30] = 0x03;
///
/// let blocks: Vec<DataBlock> = DataBlocks::new(&image, image.len(), 8).collect();
/// assert_eq!(blocks, [DataBlock { first: 2, last: 4 }, DataBlock { first: 30, last: 30 }]);
/// ```
#[derive(Debug, Clone)]
pub struct DataBlocks<'a> {
    buffer: &'a [u8],
    bound: usize,
    adr: usize,
}

impl<'a> DataBlocks<'a> {
    /// Only `buffer[..length]` is scanned; `length` is clamped to the buffer size.
    #[must_use]
    pub fn new(buffer: &'a [u8], length: usize, bound: usize) -> Self {
        Self {
            buffer: &buffer[..length.min(buffer.len())],
            bound,
            adr: 0,
        }
    }
}

impl Iterator for DataBlocks<'_> {
    type Item = DataBlock;

    fn next(&mut self) -> Option<DataBlock> {
        let mut block: Option<DataBlock> = None;

        while self.adr < self.buffer.len() {
            if self.buffer[self.adr] == BLANK {
                // Close once the blank run since the last data byte exceeds the bound
                if let Some(b) = block
                    && self.adr - b.last > self.bound
                {
                    return block;
                }
            } else {
                match block.as_mut() {
                    Some(b) => b.last = self.adr,
                    None => {
                        block = Some(DataBlock {
                            first: self.adr,
                            last: self.adr,
                        });
                    }
                }
            }
            self.adr += 1;
        }

        block
    }
}

impl FusedIterator for DataBlocks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn split(buffer: &[u8], bound: usize) -> Vec<DataBlock> {
        DataBlocks::new(buffer, buffer.len(), bound).collect()
    }

    #[test]
    fn test_all_blank_yields_nothing() {
        // Arrange
        let buffer = [BLANK; 300];

        // Act
        let blocks = split(&buffer, 64);

        // Assert
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_empty_length_yields_nothing() {
        let buffer = [0x00; 16];
        assert_eq!(DataBlocks::new(&buffer, 0, 64).next(), None);
    }

    #[test]
    fn test_single_byte() {
        // Arrange
        let mut buffer = [BLANK; 300];
        buffer[123] = 0x42;

        // Act
        let blocks = split(&buffer, 64);

        // Assert
        assert_eq!(blocks, [DataBlock { first: 123, last: 123 }]);
        assert_eq!(blocks[0].length(), 1);
    }

    #[test]
    fn test_single_byte_at_zero() {
        // Arrange
        let mut buffer = [BLANK; 300];
        buffer[0] = 0x00;

        // Act
        let blocks = split(&buffer, 64);

        // Assert
        assert_eq!(blocks, [DataBlock { first: 0, last: 0 }]);
    }

    #[test]
    fn test_block_at_zero_closes_on_long_gap() {
        // Arrange
        let mut buffer = [BLANK; 300];
        buffer[0] = 0x11;
        buffer[200] = 0x22;

        // Act
        let blocks = split(&buffer, 64);

        // Assert
        assert_eq!(
            blocks,
            [
                DataBlock { first: 0, last: 0 },
                DataBlock { first: 200, last: 200 }
            ]
        );
    }

    #[test]
    fn test_gap_up_to_bound_is_merged() {
        // Arrange: data at 10, then `bound` blanks, then data again
        let bound = 8;
        let mut buffer = [BLANK; 64];
        buffer[10] = 0x01;
        buffer[10 + bound + 1] = 0x02;

        // Act
        let blocks = split(&buffer, bound);

        // Assert
        assert_eq!(blocks, [DataBlock { first: 10, last: 19 }]);
    }

    #[test]
    fn test_gap_above_bound_splits() {
        // Arrange: data at 10, then `bound + 1` blanks, then data again
        let bound = 8;
        let mut buffer = [BLANK; 64];
        buffer[10] = 0x01;
        buffer[10 + bound + 2] = 0x02;

        // Act
        let blocks = split(&buffer, bound);

        // Assert
        assert_eq!(
            blocks,
            [
                DataBlock { first: 10, last: 10 },
                DataBlock { first: 20, last: 20 }
            ]
        );
    }

    #[test]
    fn test_trailing_blanks_are_not_part_of_block() {
        // Arrange
        let mut buffer = [BLANK; 40];
        buffer[5..9].copy_from_slice(&[1, 2, 3, 4]);

        // Act
        let blocks = split(&buffer, 64);

        // Assert
        assert_eq!(blocks, [DataBlock { first: 5, last: 8 }]);
    }

    #[test]
    fn test_non_blank_tail_terminates() {
        // Arrange
        let mut buffer = [BLANK; 100];
        buffer[90..].fill(0xA5);
        let mut blocks = DataBlocks::new(&buffer, buffer.len(), 4);

        // Act & Assert
        assert_eq!(blocks.next(), Some(DataBlock { first: 90, last: 99 }));
        assert_eq!(blocks.next(), None);
        assert_eq!(blocks.next(), None);
    }

    #[test]
    fn test_length_limits_scan() {
        // Arrange
        let mut buffer = [BLANK; 100];
        buffer[10] = 0x01;
        buffer[50] = 0x02;

        // Act
        let blocks: Vec<DataBlock> = DataBlocks::new(&buffer, 50, 64).collect();

        // Assert
        assert_eq!(blocks, [DataBlock { first: 10, last: 10 }]);
    }

    #[test]
    fn test_random_images_are_covered() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(0x15B0);

        for _ in 0..50 {
            let bound = rng.random_range(1..40);
            let mut buffer = vec![BLANK; 2048];
            for _ in 0..rng.random_range(0..20) {
                let start = rng.random_range(0..buffer.len());
                let end = (start + rng.random_range(1..60)).min(buffer.len());
                for byte in &mut buffer[start..end] {
                    *byte = rng.random_range(0..BLANK);
                }
            }

            // Act
            let blocks = split(&buffer, bound);

            // Assert: ordered, separated by more than `bound` blanks, tight ends
            for pair in blocks.windows(2) {
                assert!(pair[1].first - pair[0].last > bound + 1);
            }
            for block in &blocks {
                assert_ne!(buffer[block.first], BLANK);
                assert_ne!(buffer[block.last], BLANK);
            }

            // Assert: every data byte lies in exactly one block
            for (adr, byte) in buffer.iter().enumerate() {
                let hits = blocks.iter().filter(|b| b.range().contains(&adr)).count();
                if *byte == BLANK {
                    assert!(hits <= 1);
                } else {
                    assert_eq!(hits, 1, "byte at {adr} not covered");
                }
            }
        }
    }
}
