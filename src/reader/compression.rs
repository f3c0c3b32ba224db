//! Compression format detection and transparent decompression.
//!
//! Formats are identified by file extension; magic numbers (file signatures)
//! are only consulted for paths without one. Decoders are forward-only: they implement `Read` but not
//! `Seek`, which is why compressed input goes through the whole-reverse stream
//! mode or gets spilled to a temp file that can be memory-mapped.

use crate::error::{Result, RevlineError};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Supported compression formats for transparent file access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// No compression - plain text file
    None,
    /// Gzip compression (.gz, .z files)
    Gzip,
    /// Bzip2 compression (.bz2 files)
    Bzip2,
    /// XZ compression (.xz files)
    Xz,
    /// Legacy LZMA-alone compression (.lzma files)
    Lzma,
    /// Zstandard compression (.zst, .zstd files)
    Zstd,
}

impl CompressionType {
    /// Get human-readable name for the compression type
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Lzma => "lzma",
            Self::Zstd => "zstd",
        }
    }

    /// Check if this type represents a compressed format
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Detect compression type from the file extension, sniffing magic numbers only
/// when the path has no extension at all
///
/// Any extension is authoritative: `notes.txt` is plain text even when its
/// first bytes happen to look like a compression signature.
///
/// # Magic Numbers Used
/// - Gzip: `1f 8b 08` (RFC 1952, deflate method)
/// - Bzip2: `42 5a 68 [1-9] 31 41 59 26 53 59` ("BZh", block size, block magic)
/// - XZ: `fd 37 7a 58 5a 00` (XZ format specification)
/// - Zstd: `28 b5 2f fd` (Zstandard frame format)
///
/// LZMA-alone has no reliable signature and is only recognised by extension.
pub fn detect_compression(path: &Path) -> Result<CompressionType> {
    if path.extension().is_some() {
        return Ok(detect_by_extension(path).unwrap_or(CompressionType::None));
    }

    let file = File::open(path).map_err(|e| {
        RevlineError::file_error(format!("Failed to open file: {}", path.display()), e)
    })?;
    let mut magic = Vec::with_capacity(MAGIC_LEN);
    file.take(MAGIC_LEN as u64)
        .read_to_end(&mut magic)
        .map_err(|e| RevlineError::file_error("Failed to read file signature", e))?;

    Ok(detect_by_magic(&magic).unwrap_or(CompressionType::None))
}

/// Longest signature checked by [`detect_by_magic`]
const MAGIC_LEN: usize = 10;

/// Detect compression format from magic bytes
fn detect_by_magic(magic: &[u8]) -> Option<CompressionType> {
    if magic.starts_with(&[0x1f, 0x8b, 0x08]) {
        Some(CompressionType::Gzip)
    } else if is_bzip2_header(magic) {
        Some(CompressionType::Bzip2)
    } else if magic.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
        Some(CompressionType::Zstd)
    } else if magic.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
        Some(CompressionType::Xz)
    } else {
        None
    }
}

fn is_bzip2_header(magic: &[u8]) -> bool {
    magic.len() >= MAGIC_LEN
        && magic.starts_with(b"BZh")
        && (b'1'..=b'9').contains(&magic[3])
        && (magic[4..MAGIC_LEN] == BZIP2_BLOCK_MAGIC
            // Empty stream: end-of-stream magic right after the header
            || magic[4..MAGIC_LEN] == BZIP2_EOS_MAGIC)
}

const BZIP2_BLOCK_MAGIC: [u8; 6] = [0x31, 0x41, 0x59, 0x26, 0x53, 0x59];
const BZIP2_EOS_MAGIC: [u8; 6] = [0x17, 0x72, 0x45, 0x38, 0x50, 0x90];

/// Detect compression format from file extension
fn detect_by_extension(path: &Path) -> Option<CompressionType> {
    let ext = path.extension()?.to_str()?;
    match ext.to_lowercase().as_str() {
        "gz" | "z" => Some(CompressionType::Gzip),
        "bz2" => Some(CompressionType::Bzip2),
        "xz" => Some(CompressionType::Xz),
        "lzma" => Some(CompressionType::Lzma),
        "zst" | "zstd" => Some(CompressionType::Zstd),
        _ => None,
    }
}

/// Wrap `file` in the decoder for `compression`
pub fn decoder_for(file: File, compression: CompressionType) -> Result<Box<dyn Read + Send>> {
    let file = BufReader::new(file);
    let decoder: Box<dyn Read + Send> = match compression {
        CompressionType::None => Box::new(file),
        CompressionType::Gzip => Box::new(flate2::bufread::MultiGzDecoder::new(file)),
        CompressionType::Bzip2 => Box::new(bzip2::bufread::MultiBzDecoder::new(file)),
        CompressionType::Xz => Box::new(xz2::bufread::XzDecoder::new_multi_decoder(file)),
        CompressionType::Lzma => {
            let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX)
                .map_err(|e| RevlineError::compression(format!("lzma decoder: {e}")))?;
            Box::new(xz2::bufread::XzDecoder::new_stream(file, stream))
        }
        CompressionType::Zstd => Box::new(
            zstd::stream::read::Decoder::with_buffer(file)
                .map_err(|e| RevlineError::compression(format!("zstd decoder: {e}")))?,
        ),
    };
    Ok(decoder)
}

/// Open `path` for forward reading, decompressing transparently
pub fn open_decoder(path: &Path) -> Result<Box<dyn Read + Send>> {
    let compression = detect_compression(path)?;
    let file = File::open(path).map_err(|e| {
        RevlineError::file_error(format!("Failed to open file: {}", path.display()), e)
    })?;
    decoder_for(file, compression)
}

/// Decompress a file entirely into memory
pub fn decompress_to_memory(path: &Path, compression: CompressionType) -> Result<Vec<u8>> {
    let file = File::open(path)
        .map_err(|e| RevlineError::file_error("Failed to open compressed file", e))?;
    let mut decoder = decoder_for(file, compression)?;

    let mut data = Vec::new();
    decoder
        .read_to_end(&mut data)
        .map_err(|e| RevlineError::file_error("Failed to decompress file", e))?;
    Ok(data)
}

/// Decompress a file to a temporary file
///
/// The returned handle owns the temp file; it is deleted when dropped.
pub fn decompress_to_temp_file(
    path: &Path,
    compression: CompressionType,
) -> Result<NamedTempFile> {
    let file = File::open(path)
        .map_err(|e| RevlineError::file_error("Failed to open compressed file", e))?;
    let mut decoder = decoder_for(file, compression)?;

    let temp_file = NamedTempFile::new()
        .map_err(|e| RevlineError::file_error("Failed to create temp file", e))?;
    let temp_handle = temp_file
        .reopen()
        .map_err(|e| RevlineError::file_error("Failed to open temp file for writing", e))?;
    let mut temp_writer = BufWriter::new(temp_handle);

    let written = std::io::copy(&mut decoder, &mut temp_writer)
        .map_err(|e| RevlineError::file_error("Failed to decompress file", e))?;
    temp_writer
        .flush()
        .map_err(|e| RevlineError::file_error("Failed to flush temp file", e))?;

    log::debug!(
        "decompressed {} ({}) to {} bytes in {}",
        path.display(),
        compression.name(),
        written,
        temp_file.path().display()
    );
    Ok(temp_file)
}
