//! Path-based entry point that picks the right reader.
//!
//! # Strategy Selection
//! - Plain files: memory-mapped [`ReverseFileReader`]
//! - Compressed files smaller than `max_mem` (compressed size): decoded in memory
//!   by [`ReverseStreamReader`] in whole-reverse mode
//! - Larger compressed files: decompressed to a temp file which is then mapped,
//!   so the decompressed content never has to fit in memory

use crate::config::ReaderConfig;
use crate::error::{Result, RevlineError};
use crate::reader::capabilities::{ReaderKind, SourceCapabilities, StreamMode};
use crate::reader::compression::{decoder_for, decompress_to_temp_file, detect_compression};
use crate::reader::line_ending::detect_in_bytes;
use crate::reader::mmap::{ByteRange, ReverseFileReader};
use crate::reader::stream::ReverseStreamReader;
use crate::reader::validation::validate_file_path;
use crate::reader::Diagnostic;
use bstr::BString;
use std::fs::File;
use std::path::Path;

/// Backward line iterator over whichever reader suits the source
#[derive(Debug)]
pub enum ReverseLines {
    File(ReverseFileReader),
    Stream(ReverseStreamReader),
}

impl ReverseLines {
    /// Non-fatal observation made while opening the source, if any
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        match self {
            Self::File(reader) => reader.diagnostic(),
            Self::Stream(reader) => reader.diagnostic(),
        }
    }

    /// Release the underlying source now
    pub fn close(&mut self) {
        match self {
            Self::File(reader) => reader.close(),
            Self::Stream(reader) => reader.close(),
        }
    }
}

impl Iterator for ReverseLines {
    type Item = Result<BString>;

    fn next(&mut self) -> Option<Result<BString>> {
        match self {
            Self::File(reader) => reader.next().map(Ok),
            Self::Stream(reader) => reader.next(),
        }
    }
}

/// Open `path` for backward line iteration
///
/// The terminator is detected from the first line; an unterminated first line
/// fails with [`RevlineError::UnknownLineEnding`] before any line is produced.
pub fn open_reverse(path: &Path, config: &ReaderConfig) -> Result<ReverseLines> {
    validate_file_path(path)?;
    config.validate()?;

    let compression = detect_compression(path)?;
    let file = File::open(path).map_err(|e| {
        RevlineError::file_error(format!("Failed to open file: {}", path.display()), e)
    })?;
    let on_disk_size = file
        .metadata()
        .map_err(|e| RevlineError::file_error("Failed to get file metadata", e))?
        .len();

    if !compression.is_compressed() {
        let caps = SourceCapabilities::plain_file(on_disk_size, config);
        debug_assert_eq!(ReaderKind::select(&caps, config), ReaderKind::File);
        let (source, diagnostic) = ByteRange::map_file(&file)?;
        return file_reader(source, diagnostic).map(ReverseLines::File);
    }

    let caps = if on_disk_size < config.max_mem {
        SourceCapabilities::forward_only()
    } else {
        // Spilled to disk, the decompressed bytes become a mappable range
        SourceCapabilities {
            supports_random_access: true,
            ..SourceCapabilities::forward_only()
        }
    };

    match ReaderKind::select(&caps, config) {
        ReaderKind::File => {
            log::debug!(
                "{} is {} compressed and {} bytes on disk, spilling to a temp file",
                path.display(),
                compression.name(),
                on_disk_size
            );
            drop(file);
            let temp_file = decompress_to_temp_file(path, compression)?;
            let (source, diagnostic) = ByteRange::map_temp_file(temp_file)?;
            file_reader(source, diagnostic).map(ReverseLines::File)
        }
        ReaderKind::Stream(StreamMode::WholeReverse) => {
            let decoder = decoder_for(file, compression)?;
            ReverseStreamReader::forward_only_detect(decoder).map(ReverseLines::Stream)
        }
        ReaderKind::Stream(mode) => Err(RevlineError::compression(format!(
            "{} streams cannot be read in {mode:?} mode",
            compression.name()
        ))),
    }
}

fn file_reader(source: ByteRange, map_diagnostic: Option<Diagnostic>) -> Result<ReverseFileReader> {
    let detection = detect_in_bytes(source.as_bytes())?;
    let diagnostic = map_diagnostic.or(detection.diagnostic);
    Ok(ReverseFileReader::new(source, detection.ending).with_diagnostic(diagnostic))
}
