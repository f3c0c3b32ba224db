//! Backward line iteration over streams
//!
//! [`ReverseStreamReader`] covers the sources [`ReverseFileReader`] cannot:
//! forward-only decoders and sources small enough to reverse in memory. Large
//! seekable sources are walked backwards block by block with a bounded buffer.
//!
//! [`ReverseFileReader`]: crate::reader::ReverseFileReader

use crate::config::ReaderConfig;
use crate::error::{Result, RevlineError};
use crate::reader::capabilities::{SourceCapabilities, StreamMode};
use crate::reader::compression::{decoder_for, decompress_to_temp_file, detect_compression};
use crate::reader::line_ending::{detect_in_bytes, detect_line_ending, LineEnding};
use crate::reader::Diagnostic;
use bstr::BString;
use memchr::memmem;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// A byte source that can be read and repositioned
pub trait SeekRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekRead for T {}

/// Lazy, single-pass iterator over the lines of a stream, last line first
///
/// Items are `Result`s because block-wise mode keeps reading while iterating. A
/// read error is yielded once and ends the sequence.
pub struct ReverseStreamReader {
    state: State,
    ending: LineEnding,
    diagnostic: Option<Diagnostic>,
}

enum State {
    /// Lines in file order; popped from the back
    Whole(Vec<BString>),
    Blocks(BackwardCursor),
    Done,
}

impl ReverseStreamReader {
    /// Reverse a forward-only source in memory
    pub fn forward_only<R: Read>(mut reader: R, ending: LineEnding) -> Result<Self> {
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| RevlineError::file_error("Failed to read stream", e))?;
        Ok(Self::from_content(content, ending, None))
    }

    /// Reverse a forward-only source in memory, detecting its terminator
    pub fn forward_only_detect<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| RevlineError::file_error("Failed to read stream", e))?;
        let detection = detect_in_bytes(&content)?;
        Ok(Self::from_content(
            content,
            detection.ending,
            detection.diagnostic,
        ))
    }

    /// Reverse a seekable source, picking the mode from its capabilities
    pub fn new<S: SeekRead + 'static>(
        mut source: S,
        ending: LineEnding,
        caps: SourceCapabilities,
        config: &ReaderConfig,
    ) -> Result<Self> {
        match StreamMode::select(&caps, config) {
            StreamMode::WholeReverse => {
                source
                    .seek(SeekFrom::Start(0))
                    .map_err(|e| RevlineError::file_error("Failed to rewind stream", e))?;
                Self::forward_only(source, ending)
            }
            StreamMode::BlockScan { block_size } => {
                let cursor = BackwardCursor::new(Box::new(source), ending, block_size)?;
                Ok(Self {
                    state: State::Blocks(cursor),
                    ending,
                    diagnostic: None,
                })
            }
        }
    }

    /// Open the file at `path`, decompressing transparently
    ///
    /// Plain files are seekable and get block-wise mode once they exceed the
    /// memory budget. Compressed files below `max_mem` on disk are decoded and
    /// reversed in memory; larger ones are decompressed to a temp file first,
    /// which is then read like a plain file.
    pub fn open(path: &Path, config: &ReaderConfig) -> Result<Self> {
        config.validate()?;
        let compression = detect_compression(path)?;
        let file = File::open(path).map_err(|e| {
            RevlineError::file_error(format!("Failed to open file: {}", path.display()), e)
        })?;

        if !compression.is_compressed() {
            return Self::from_seekable(file, config);
        }

        let on_disk_size = file
            .metadata()
            .map_err(|e| RevlineError::file_error("Failed to get file metadata", e))?
            .len();
        if on_disk_size < config.max_mem {
            return Self::forward_only_detect(decoder_for(file, compression)?);
        }

        drop(file);
        log::debug!(
            "{} is {} compressed and {} bytes on disk, spilling to a temp file",
            path.display(),
            compression.name(),
            on_disk_size
        );
        // The temp file is deleted when the reader drops it
        let spilled = decompress_to_temp_file(path, compression)?;
        Self::from_seekable(spilled, config)
    }

    /// Detect the terminator of a seekable source, then reverse it
    fn from_seekable<S: SeekRead + 'static>(mut source: S, config: &ReaderConfig) -> Result<Self> {
        let size = source
            .seek(SeekFrom::End(0))
            .and_then(|size| source.seek(SeekFrom::Start(0)).map(|_| size))
            .map_err(|e| RevlineError::file_error("Failed to measure stream", e))?;

        let detection = detect_line_ending(BufReader::new(&mut source))?;
        if detection.diagnostic.is_some() {
            return Ok(Self::from_content(Vec::new(), detection.ending, detection.diagnostic));
        }

        let caps = SourceCapabilities::seekable(size, false, config);
        Self::new(source, detection.ending, caps, config)
    }

    fn from_content(content: Vec<u8>, ending: LineEnding, diagnostic: Option<Diagnostic>) -> Self {
        Self {
            state: State::Whole(split_lines(&content, ending)),
            ending,
            diagnostic,
        }
    }

    pub fn line_ending(&self) -> LineEnding {
        self.ending
    }

    /// Non-fatal observation made while opening the source, if any
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.diagnostic
    }

    /// Which mode this reader runs in
    pub fn mode(&self) -> Option<StreamMode> {
        match &self.state {
            State::Whole(_) => Some(StreamMode::WholeReverse),
            State::Blocks(cursor) => Some(StreamMode::BlockScan {
                block_size: cursor.block_size,
            }),
            State::Done => None,
        }
    }

    /// Release the source now; the iterator yields nothing afterwards
    pub fn close(&mut self) {
        self.state = State::Done;
    }
}

impl std::fmt::Debug for ReverseStreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseStreamReader")
            .field("mode", &self.mode())
            .field("ending", &self.ending)
            .field("diagnostic", &self.diagnostic)
            .finish()
    }
}

impl Iterator for ReverseStreamReader {
    type Item = Result<BString>;

    fn next(&mut self) -> Option<Result<BString>> {
        let item = match &mut self.state {
            State::Whole(lines) => lines.pop().map(Ok),
            State::Blocks(cursor) => cursor.next_line().transpose(),
            State::Done => None,
        };

        // Drop the buffer or the source handle as soon as there is nothing left
        match item {
            Some(Ok(line)) => Some(Ok(line)),
            other => {
                self.state = State::Done;
                other
            }
        }
    }
}

/// Split `content` into lines, each keeping its terminator
///
/// The final element lacks a terminator when the content does not end with one.
fn split_lines(content: &[u8], ending: LineEnding) -> Vec<BString> {
    let token = ending.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    for pos in memmem::find_iter(content, token) {
        let end = pos + token.len();
        lines.push(BString::from(&content[start..end]));
        start = end;
    }
    if start < content.len() {
        lines.push(BString::from(&content[start..]));
    }
    lines
}

/// State of a block-wise backward scan
struct BackwardCursor {
    source: Box<dyn SeekRead>,

    /// Offset of the first byte already pulled into `buf`
    pos: u64,

    /// Undelivered bytes ending right before the last delivered line
    buf: Vec<u8>,

    /// Whether the file's last byte is the terminator's last byte
    trailing_terminator_present: bool,

    /// No line has been extracted yet
    first_extraction: bool,

    /// The start-of-file sentinel terminator has been put in front of `buf`
    sentinel_placed: bool,

    ending: LineEnding,
    finder: memmem::FinderRev<'static>,
    block_size: usize,
}

impl BackwardCursor {
    fn new(mut source: Box<dyn SeekRead>, ending: LineEnding, block_size: usize) -> Result<Self> {
        let size = source
            .seek(SeekFrom::End(0))
            .map_err(|e| RevlineError::file_error("Failed to seek to end of stream", e))?;

        let trailing_terminator_present = if size == 0 {
            false
        } else {
            let mut last = [0u8; 1];
            source
                .seek(SeekFrom::Start(size - 1))
                .and_then(|_| source.read_exact(&mut last))
                .map_err(|e| RevlineError::file_error("Failed to read last byte", e))?;
            last[0] == ending.last_byte()
        };

        // The trailing terminator is handed back on the first line, so it never
        // needs to enter the buffer.
        let pos = if trailing_terminator_present {
            size.saturating_sub(ending.token_len() as u64)
        } else {
            size
        };

        Ok(Self {
            source,
            pos,
            buf: Vec::new(),
            trailing_terminator_present,
            first_extraction: true,
            // An empty source has no first line to delimit
            sentinel_placed: size == 0,
            ending,
            finder: memmem::FinderRev::new(ending.as_bytes()),
            block_size: block_size.max(1),
        })
    }

    fn next_line(&mut self) -> Result<Option<BString>> {
        let token = self.ending.as_bytes();
        loop {
            if let Some(idx) = self.finder.rfind(&self.buf) {
                let mut line = self.buf.split_off(idx + token.len());
                self.buf.truncate(idx);

                if !self.first_extraction || self.trailing_terminator_present {
                    line.extend_from_slice(token);
                }
                self.first_extraction = false;
                return Ok(Some(BString::from(line)));
            }

            if self.pos > 0 {
                self.fill()?;
            } else if !self.sentinel_placed {
                // Delimit the file's first physical line
                let mut framed = token.to_vec();
                framed.append(&mut self.buf);
                self.buf = framed;
                self.sentinel_placed = true;
            } else {
                return Ok(None);
            }
        }
    }

    /// Prepend the block that ends at `pos`
    fn fill(&mut self) -> Result<()> {
        let to_read = (self.block_size as u64).min(self.pos);
        let start = self.pos - to_read;

        let mut block = vec![0u8; to_read as usize];
        self.source
            .seek(SeekFrom::Start(start))
            .and_then(|_| self.source.read_exact(&mut block))
            .map_err(|e| RevlineError::file_error(format!("Failed to read block at {start}"), e))?;

        block.extend_from_slice(&self.buf);
        self.buf = block;
        self.pos = start;
        Ok(())
    }
}
