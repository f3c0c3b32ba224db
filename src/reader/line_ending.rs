//! Line terminator detection.
//!
//! Detection looks at the first line only and assumes the rest of the file uses
//! the same terminator. Files mixing `\n` and `\r\n` are not supported.
//!
//! Detection is strict: a first line without any terminator is an error, even
//! though the readers themselves tolerate an unterminated *last* line.

use crate::error::{Result, RevlineError};
use crate::reader::compression::open_decoder;
use crate::reader::Diagnostic;
use bstr::BString;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Terminator convention of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Unix `\n`
    #[default]
    Lf,
    /// Windows `\r\n`
    Crlf,
}

impl LineEnding {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::Crlf => b"\r\n",
        }
    }

    pub fn token_len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Last byte of the terminator, `\n` for both conventions
    pub fn last_byte(&self) -> u8 {
        b'\n'
    }
}

/// Outcome of terminator detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub ending: LineEnding,
    pub diagnostic: Option<Diagnostic>,
}

/// Classify a first line (including its terminator, if any)
fn classify(first_line: &[u8]) -> Result<Detection> {
    if first_line.is_empty() {
        log::warn!("{}", Diagnostic::EmptyFile);
        return Ok(Detection {
            ending: LineEnding::Lf,
            diagnostic: Some(Diagnostic::EmptyFile),
        });
    }

    let ending = if first_line.ends_with(b"\r\n") {
        LineEnding::Crlf
    } else if first_line.ends_with(b"\n") {
        LineEnding::Lf
    } else {
        return Err(RevlineError::UnknownLineEnding {
            first_line: BString::from(first_line),
        });
    };

    Ok(Detection {
        ending,
        diagnostic: None,
    })
}

/// Detect the terminator by reading the first line from `reader`
///
/// The reader is left positioned after the first line. Callers holding a
/// seekable source should rewind before handing it to a reader.
pub fn detect_line_ending<R: BufRead>(mut reader: R) -> Result<Detection> {
    let mut first_line = Vec::new();
    reader
        .read_until(b'\n', &mut first_line)
        .map_err(|e| RevlineError::file_error("Failed to read first line", e))?;
    classify(&first_line)
}

/// Detect the terminator of an in-memory buffer
pub fn detect_in_bytes(bytes: &[u8]) -> Result<Detection> {
    let first_line = match memchr::memchr(b'\n', bytes) {
        Some(pos) => &bytes[..=pos],
        None => bytes,
    };
    classify(first_line)
}

/// Detect the terminator of a file, decompressing it transparently
pub fn detect_path(path: &Path) -> Result<Detection> {
    let decoder = open_decoder(path)?;
    detect_line_ending(BufReader::new(decoder))
}
