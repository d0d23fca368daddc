//! # `ispnublib`
//!
//! `ispnublib` builds firmware images for ISPnub stand-alone AVR programmers. It compiles an
//! ISP script plus the Intel HEX images the script references into a binary command stream
//! and places it inside the programmer's own flash image.
//!
//! The library provides:
//! - Intel HEX decoding into and encoding from flat memory images (via [`MemoryImage`]).
//! - Splitting of sparse images into contiguous write regions (via [`DataBlocks`]).
//! - The script compiler (via [`ScriptCompiler`]).
//! - Error handling with [`IspnubError`].
//!
//! ## Example
//!
//! ```
//! use ispnublib::{CompilerConfig, Layout, MemoryImage, ScriptCompiler};
//!
//! let layout = Layout::default();
//! let mut mem = MemoryImage::new(layout.controller_memory_size);
//! let compiler = ScriptCompiler::new(CompilerConfig::new(&layout));
//!
//! let end = compiler.compile("CONNECT 1000000\nWAIT 10\nEND", &mut mem, layout.script_start).unwrap();
//! assert_eq!(&mem.as_slice()[layout.script_start..end], &[0x01, 0x05, 0x06, 0x0A, 0xFF]);
//!
//! let hex = mem.to_hex_string(end);
//! assert!(hex.ends_with(":00000001FF\n"));
//! ```

mod blocks;
mod config;
mod error;
mod image;
mod record;
mod script;

// Public APIs
pub use blocks::{DataBlock, DataBlocks};
pub use config::{BLANK, CompilerConfig, Layout, Opcode, SCK_OPTIONS, sck_index};
pub use error::{IspnubError, IspnubErrorKind};
pub use image::MemoryImage;
pub use record::{Record, RecordType};
pub use script::ScriptCompiler;
