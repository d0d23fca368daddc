//! Memory layout, compiler settings and the constants of the ISPnub command stream.

use std::path::PathBuf;

/// Value of unprogrammed flash/EEPROM cells.
pub const BLANK: u8 = 0xFF;

/// SPI clock frequencies (Hz) selectable on the programmer, indexed by divider setting.
pub const SCK_OPTIONS: [u32; 7] = [2_000_000, 500_000, 125_000, 62_500, 4_000_000, 1_000_000, 250_000];

/// Divider used when no table entry fits the requested frequency.
const SCK_FALLBACK_INDEX: u8 = 3;
/// Requests further than this above every table entry fall back as well.
const SCK_MAX_DIFF: i64 = 8_000_000;

/// Instruction opcodes understood by the programmer's interpreter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Connect = 0x01,
    Disconnect = 0x02,
    SpiWrite = 0x03,
    SpiVerify = 0x04,
    Flash = 0x05,
    Wait = 0x06,
    DecCounter = 0x07,
    Eeprom = 0x08,
    End = 0xFF,
}

/// Returns the divider index of the largest SCK option not exceeding `frequency`.
///
/// # Example
/// ```
/// use ispnublib::sck_index;
///
/// assert_eq!(sck_index(1_000_000), 5);
/// assert_eq!(sck_index(100), 3);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn sck_index(frequency: i64) -> u8 {
    let mut best_diff = SCK_MAX_DIFF;
    let mut best_index = SCK_FALLBACK_INDEX;

    for (index, option) in SCK_OPTIONS.iter().enumerate() {
        let diff = frequency - i64::from(*option);
        if diff < 0 {
            continue;
        }
        if diff < best_diff {
            best_diff = diff;
            best_index = index as u8;
        }
    }

    best_index
}

/// Memory layout of the programmer firmware and of the devices it programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Flash size of the programmer's own controller
    pub controller_memory_size: usize,
    /// Largest flash/EEPROM image a script may reference
    pub target_memory_size: usize,
    /// Offset in controller flash where the command stream starts
    pub script_start: usize,
}

impl Layout {
    /// ATmega1284P based ISPnub module.
    pub const ATMEGA1284P: Self = Self {
        controller_memory_size: 128 * 1024,
        target_memory_size: 256 * 1024,
        script_start: 0x1000,
    };
}

impl Default for Layout {
    fn default() -> Self {
        Self::ATMEGA1284P
    }
}

/// Settings consumed by [`ScriptCompiler`](crate::ScriptCompiler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Capacity of the scratch image FLASH/EEPROM sources are decoded into
    pub target_memory_size: usize,
    /// Smallest blank run that separates two emitted blocks
    pub min_bound: usize,
    /// Directory relative FLASH/EEPROM file names are resolved against
    pub base_dir: Option<PathBuf>,
}

impl CompilerConfig {
    #[must_use]
    pub const fn new(layout: &Layout) -> Self {
        Self {
            target_memory_size: layout.target_memory_size,
            min_bound: 64,
            base_dir: None,
        }
    }

    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Blank run length that closes a block for the given page size.
    #[must_use]
    pub fn bound_for(&self, pagesize: usize) -> usize {
        self.min_bound.max(pagesize.saturating_mul(2))
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new(&Layout::default())
    }
}
