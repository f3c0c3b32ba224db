//! Backward line readers with memory mapping and compression support.
//!
//! This module provides the core reading functionality for revline:
//!
//! - [`line_ending`] decides the terminator convention from a file's first line
//! - [`mmap`] walks a contiguous byte range (usually a memory map) backwards
//! - [`stream`] reverses forward-only or size-bounded streams
//! - [`capabilities`] turns what a source can do into a reader choice
//! - [`compression`] and [`factory`] open paths, compressed or not

pub mod capabilities;
pub mod compression;
pub mod factory;
pub mod line_ending;
pub mod mmap;
pub mod stream;
pub mod validation;

pub use capabilities::{ReaderKind, SourceCapabilities, StreamMode};
pub use compression::{detect_compression, CompressionType};
pub use factory::{open_reverse, ReverseLines};
pub use line_ending::{detect_in_bytes, detect_line_ending, detect_path, Detection, LineEnding};
pub use mmap::{ByteRange, ReverseFileReader};
pub use stream::ReverseStreamReader;
pub use validation::validate_file_path;

/// Non-fatal observations made while opening a source
///
/// These never stop iteration; the affected reader simply yields no lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// The source holds zero bytes; `\n` was assumed as the terminator
    EmptyFile,
    /// Mapping a zero-length file failed and was replaced by an empty range
    EmptyMapping,
}

impl Diagnostic {
    pub fn message(&self) -> &'static str {
        match self {
            Self::EmptyFile => "File empty, use default line ending \\n.",
            Self::EmptyMapping => "Trying to mmap an empty file.",
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
