//! Backward line iteration over a contiguous byte range
//!
//! [`ReverseFileReader`] owns a [`ByteRange`] (normally a memory map) and walks it
//! from the end towards the start, handing out one line per `next` call. Nothing
//! beyond the current line is copied, so the working set stays bounded no matter
//! how large the file is.

use crate::error::{Result, RevlineError};
use crate::reader::line_ending::{detect_in_bytes, LineEnding};
use crate::reader::Diagnostic;
use bstr::BString;
use memchr::memmem;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tempfile::NamedTempFile;

/// Read-only, randomly addressable view over a file's (decompressed) bytes
#[derive(Debug)]
pub enum ByteRange {
    /// Nothing to read (zero-length file)
    Empty,
    /// Content held in memory
    InMemory(Vec<u8>),
    /// Content accessed via memory mapping
    Mapped(Mmap),
    /// Compressed file decompressed to a temp file and memory-mapped;
    /// the temp file lives as long as the mapping
    Decompressed {
        mmap: Mmap,
        _temp_file: NamedTempFile,
    },
}

impl ByteRange {
    /// Get the underlying bytes as a slice regardless of storage strategy
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ByteRange::Empty => &[],
            ByteRange::InMemory(vec) => vec.as_slice(),
            ByteRange::Mapped(mmap) => &mmap[..],
            ByteRange::Decompressed { mmap, .. } => &mmap[..],
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map `file` read-only
    ///
    /// A zero-length file yields [`ByteRange::Empty`] instead of an error, along
    /// with [`Diagnostic::EmptyMapping`] when the platform refused the mapping.
    pub fn map_file(file: &File) -> Result<(Self, Option<Diagnostic>)> {
        let file_size = file
            .metadata()
            .map_err(|e| RevlineError::file_error("Failed to get file metadata", e))?
            .len();
        if file_size == 0 {
            return Ok((Self::Empty, None));
        }

        // SAFETY: the mapping is read-only; concurrent truncation of the file by
        // another process is outside what this reader supports.
        match unsafe { Mmap::map(file) } {
            Ok(mmap) => {
                advise_backward(&mmap);
                Ok((Self::Mapped(mmap), None))
            }
            Err(e) if is_empty_now(file) => {
                log::warn!("{}: {e}", Diagnostic::EmptyMapping);
                Ok((Self::Empty, Some(Diagnostic::EmptyMapping)))
            }
            Err(e) => Err(RevlineError::memory_mapping(e.to_string())),
        }
    }

    /// Map a temp file holding decompressed content, taking ownership of it
    pub fn map_temp_file(temp_file: NamedTempFile) -> Result<(Self, Option<Diagnostic>)> {
        let handle = temp_file
            .reopen()
            .map_err(|e| RevlineError::file_error("Failed to reopen temp file", e))?;
        match Self::map_file(&handle)? {
            (Self::Mapped(mmap), diagnostic) => Ok((
                Self::Decompressed {
                    mmap,
                    _temp_file: temp_file,
                },
                diagnostic,
            )),
            other => Ok(other),
        }
    }
}

/// The file may have been truncated between the size check and the mapping
fn is_empty_now(file: &File) -> bool {
    file.metadata().map(|m| m.len() == 0).unwrap_or(false)
}

#[cfg(unix)]
fn advise_backward(mmap: &Mmap) {
    // We walk backwards, which the kernel's readahead handles no better than random
    if let Err(e) = mmap.advise(memmap2::Advice::Random) {
        log::debug!("failed to set mmap advice: {e}");
    }
}

#[cfg(not(unix))]
fn advise_backward(_mmap: &Mmap) {}

/// Lazy, single-pass iterator over the lines of a byte range, last line first
///
/// Every yielded line keeps its trailing terminator. The file's physical last
/// line is yielded first and keeps whatever terminator it had, possibly none.
/// The byte range is released as soon as the first physical line is handed out.
#[derive(Debug)]
pub struct ReverseFileReader {
    /// `None` once exhausted or closed
    source: Option<ByteRange>,

    /// Exclusive end of the not yet delivered prefix
    end: usize,

    ending: LineEnding,
    finder: memmem::FinderRev<'static>,
    diagnostic: Option<Diagnostic>,
}

impl ReverseFileReader {
    /// Iterate `source` backwards using `ending` as line terminator
    pub fn new(source: ByteRange, ending: LineEnding) -> Self {
        let end = source.len();
        let source = if end == 0 { None } else { Some(source) };
        Self {
            source,
            end,
            ending,
            finder: memmem::FinderRev::new(ending.as_bytes()),
            diagnostic: None,
        }
    }

    /// Map `file` and iterate it backwards
    pub fn from_file(file: File, ending: LineEnding) -> Result<Self> {
        let (source, diagnostic) = ByteRange::map_file(&file)?;
        Ok(Self::new(source, ending).with_diagnostic(diagnostic))
    }

    /// Map the file at `path`, detecting its terminator from the first line
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            RevlineError::file_error(format!("Failed to open file: {}", path.display()), e)
        })?;
        let (source, map_diagnostic) = ByteRange::map_file(&file)?;
        let detection = detect_in_bytes(source.as_bytes())?;
        let diagnostic = map_diagnostic.or(detection.diagnostic);
        Ok(Self::new(source, detection.ending).with_diagnostic(diagnostic))
    }

    pub(crate) fn with_diagnostic(mut self, diagnostic: Option<Diagnostic>) -> Self {
        self.diagnostic = diagnostic;
        self
    }

    pub fn line_ending(&self) -> LineEnding {
        self.ending
    }

    /// Non-fatal observation made while opening the source, if any
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.diagnostic
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> usize {
        self.end
    }

    /// Release the byte range now; the iterator yields nothing afterwards
    pub fn close(&mut self) {
        self.source = None;
        self.end = 0;
    }
}

impl Iterator for ReverseFileReader {
    type Item = BString;

    fn next(&mut self) -> Option<BString> {
        let bytes = self.source.as_ref()?.as_bytes();
        let end = self.end;
        let token = self.ending.as_bytes();

        // The line's own terminator sits right before `end`; skip it so the
        // search finds the terminator of the previous line.
        let body_end = if bytes[..end].ends_with(token) {
            end - token.len()
        } else {
            end
        };

        let start = match self.finder.rfind(&bytes[..body_end]) {
            Some(pos) => pos + token.len(),
            None => 0,
        };
        let line = BString::from(&bytes[start..end]);

        self.end = start;
        if start == 0 {
            self.source = None;
        }
        Some(line)
    }
}
