//! The `script` module compiles an ISPnub script into the binary command stream executed by
//! the programmer.
//!
//! A script is line oriented: `;` starts a comment, the first word of a line is the command
//! (case-insensitive) and the rest is a comma-separated parameter list. Integers are decimal
//! unless prefixed with `0x`.
//!
//! ```text
//! CONNECT 1000000          ; SPI clock, rounded down to a supported divider
//! SPIVERIFY 0x30,0,0,0,0x1E
//! FLASH firmware.hex,0,128 ; file, target address, page size
//! DISCONNECT
//! END
//! ```

use crate::config::{CompilerConfig, Opcode, sck_index};
use crate::error::{IspnubError, IspnubErrorKind};
use crate::image::MemoryImage;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Command token followed by an optional parameter list.
#[allow(clippy::expect_used)]
static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)(?:\s+(.*))?$").expect("line pattern is valid"));

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Command {
    Connect,
    Disconnect,
    SpiWrite,
    SpiVerify,
    Flash,
    Eeprom,
    Wait,
    DecCounter,
    End,
}

impl Command {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "CONNECT" => Some(Self::Connect),
            "DISCONNECT" => Some(Self::Disconnect),
            "SPIWRITE" => Some(Self::SpiWrite),
            "SPIVERIFY" => Some(Self::SpiVerify),
            "FLASH" => Some(Self::Flash),
            "EEPROM" => Some(Self::Eeprom),
            "WAIT" => Some(Self::Wait),
            "DECCOUNTER" => Some(Self::DecCounter),
            "END" => Some(Self::End),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Disconnect => "DISCONNECT",
            Self::SpiWrite => "SPIWRITE",
            Self::SpiVerify => "SPIVERIFY",
            Self::Flash => "FLASH",
            Self::Eeprom => "EEPROM",
            Self::Wait => "WAIT",
            Self::DecCounter => "DECCOUNTER",
            Self::End => "END",
        }
    }

    /// Number of parameters the command requires.
    const fn arity(self) -> usize {
        match self {
            Self::Disconnect | Self::End => 0,
            Self::Connect | Self::Wait | Self::DecCounter => 1,
            Self::Flash | Self::Eeprom => 3,
            Self::SpiWrite => 4,
            Self::SpiVerify => 5,
        }
    }

    const fn opcode(self) -> Opcode {
        match self {
            Self::Connect => Opcode::Connect,
            Self::Disconnect => Opcode::Disconnect,
            Self::SpiWrite => Opcode::SpiWrite,
            Self::SpiVerify => Opcode::SpiVerify,
            Self::Flash => Opcode::Flash,
            Self::Eeprom => Opcode::Eeprom,
            Self::Wait => Opcode::Wait,
            Self::DecCounter => Opcode::DecCounter,
            Self::End => Opcode::End,
        }
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal integer.
fn parse_int(s: &str) -> Result<i64, IspnubErrorKind> {
    let s = s.trim();
    let (digits, radix) = match s.strip_prefix("0x") {
        Some(hex) if !hex.is_empty() => (hex, 16),
        _ => (s, 10),
    };
    i64::from_str_radix(digits, radix).map_err(|_| IspnubErrorKind::InvalidInteger(s.to_string()))
}

/// Low 8 bits of a parameter.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn low_byte(value: i64) -> u8 {
    value as u8
}

/// Sequential writer into the destination image.
struct Emitter<'a> {
    dest: &'a mut [u8],
    pos: usize,
    line: usize,
}

impl Emitter<'_> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), IspnubError> {
        let end = self.pos + bytes.len();
        let capacity = self.dest.len();
        let Some(target) = self.dest.get_mut(self.pos..end) else {
            return Err(IspnubError::Capacity {
                address: self.pos.max(capacity),
                capacity,
                line: self.line,
            });
        };
        target.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }
}

/// Translates script lines into ISPnub instructions.
#[derive(Debug, Clone, Default)]
pub struct ScriptCompiler {
    config: CompilerConfig,
}

impl ScriptCompiler {
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles the script file into `dest`, starting at `pos`.
    /// Returns the position just behind the last instruction written.
    ///
    /// # Errors
    /// Returns an error if the script or a referenced hex file cannot be read or is
    /// malformed, or if the command stream does not fit into `dest`.
    pub fn compile_file<P: AsRef<Path>>(
        &self,
        filepath: P,
        dest: &mut MemoryImage,
        pos: usize,
    ) -> Result<usize, IspnubError> {
        let script = std::fs::read_to_string(&filepath)
            .map_err(|err| IspnubError::io(filepath.as_ref(), err))?;

        self.compile(&script, dest, pos)
    }

    /// Compiles script text into `dest`, starting at `pos`.
    /// Returns the position just behind the last instruction written.
    ///
    /// # Errors
    /// Returns an error on the first malformed line, unreadable or malformed hex file, or
    /// instruction that does not fit into `dest`.
    ///
    /// # Example
    /// ```
    /// use ispnublib::{MemoryImage, ScriptCompiler};
    ///
    /// let mut mem = MemoryImage::new(0x2000);
    /// let end = ScriptCompiler::default().compile("WAIT 100 ; settle", &mut mem, 0x1000).unwrap();
    ///
    /// assert_eq!(end, 0x1002);
    /// assert_eq!(&mem.as_slice()[0x1000..0x1002], &[0x06, 0x64]);
    /// ```
    pub fn compile(
        &self,
        script: &str,
        dest: &mut MemoryImage,
        pos: usize,
    ) -> Result<usize, IspnubError> {
        let mut emitter = Emitter {
            dest: dest.as_mut_slice(),
            pos,
            line: 0,
        };

        for (index, line) in script.lines().enumerate() {
            emitter.line = index + 1;
            self.compile_line(line, &mut emitter)?;
        }

        Ok(emitter.pos)
    }

    fn compile_line(&self, line: &str, emitter: &mut Emitter<'_>) -> Result<(), IspnubError> {
        let line_no = emitter.line;
        let head = line.split(';').next().unwrap_or_default().trim();
        let Some(caps) = LINE_RE.captures(head) else {
            return Ok(());
        };

        let token = caps[1].to_ascii_uppercase();
        let params: Vec<&str> = caps
            .get(2)
            .map(|m| m.as_str().split(',').collect())
            .unwrap_or_default();

        let Some(command) = Command::from_token(&token) else {
            log::warn!("Unknown command \"{token}\" in line {line_no}, skipped");
            return Ok(());
        };

        if params.len() < command.arity() {
            return Err(IspnubError::Script(
                IspnubErrorKind::MissingParameter {
                    command: command.name(),
                    expected: command.arity(),
                    found: params.len(),
                },
                line_no,
            ));
        } else if params.len() > command.arity() {
            log::warn!(
                "Command {} in line {line_no} takes {} parameter(s), ignoring the rest",
                command.name(),
                command.arity()
            );
        }

        let int = |index: usize| -> Result<i64, IspnubError> {
            parse_int(params[index]).map_err(|err| IspnubError::Script(err, line_no))
        };

        let start = emitter.pos;
        match command {
            Command::Connect => {
                emitter.put(&[command.opcode() as u8, sck_index(int(0)?)])?;
            }
            Command::Disconnect | Command::End => {
                emitter.put(&[command.opcode() as u8])?;
            }
            Command::SpiWrite | Command::SpiVerify => {
                let mut bytes = vec![command.opcode() as u8];
                for index in 0..command.arity() {
                    bytes.push(low_byte(int(index)?));
                }
                emitter.put(&bytes)?;
            }
            Command::Wait => {
                emitter.put(&[command.opcode() as u8, low_byte(int(0)?)])?;
            }
            Command::DecCounter => {
                let counter = int(0)?;
                emitter.put(&[
                    command.opcode() as u8,
                    low_byte(counter >> 8),
                    low_byte(counter),
                ])?;
            }
            Command::Flash | Command::Eeprom => {
                let filename = params[0].trim();
                if filename.is_empty() {
                    return Err(IspnubError::Script(
                        IspnubErrorKind::EmptyFileName(command.name()),
                        line_no,
                    ));
                }
                let start_address = int(1)?;
                let pagesize = int(2)?;
                self.emit_image(command, filename, start_address, pagesize, emitter)?;
            }
        }

        log::debug!(
            "line {line_no}: {} -> 0x{start:05X}..0x{:05X}",
            command.name(),
            emitter.pos
        );

        Ok(())
    }

    /// Emits one instruction per data block of the referenced hex file:
    /// opcode, target address (u32 BE), block length (u32 BE), page size (u16 BE), payload.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn emit_image(
        &self,
        command: Command,
        filename: &str,
        start_address: i64,
        pagesize: i64,
        emitter: &mut Emitter<'_>,
    ) -> Result<(), IspnubError> {
        let path = self.resolve(filename);
        let mut scratch = MemoryImage::new(self.config.target_memory_size);
        let length = scratch.load_hex(&path, 0)?;

        let bound = self
            .config
            .bound_for(usize::try_from(pagesize).unwrap_or_default());

        let mut count = 0;
        for block in scratch.blocks(length, bound) {
            let address = start_address.wrapping_add(block.first as i64) as u32;

            emitter.put(&[command.opcode() as u8])?;
            emitter.put(&address.to_be_bytes())?;
            emitter.put(&(block.length() as u32).to_be_bytes())?;
            emitter.put(&(pagesize as u16).to_be_bytes())?;
            emitter.put(&scratch.as_slice()[block.range()])?;

            log::debug!(
                "{} block 0x{:06X}..=0x{:06X} of {} -> target 0x{address:06X}",
                command.name(),
                block.first,
                block.last,
                path.display()
            );
            count += 1;
        }

        if count == 0 {
            log::debug!("{} has no data, nothing emitted", path.display());
        }

        Ok(())
    }

    fn resolve(&self, filename: &str) -> PathBuf {
        match &self.config.base_dir {
            Some(dir) => dir.join(filename),
            None => PathBuf::from(filename),
        }
    }
}
