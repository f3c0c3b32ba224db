//! Capability descriptor and reader selection.
//!
//! What a source can do is declared once, up front, as a [`SourceCapabilities`]
//! value. Choosing a reader (and the operating mode of the stream reader) is then
//! a pure function of that value and the [`ReaderConfig`].

use crate::config::ReaderConfig;

/// What a byte source supports, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceCapabilities {
    /// The whole (decompressed) content can be viewed as one contiguous byte range
    pub supports_random_access: bool,

    /// The source can seek to arbitrary earlier offsets
    pub supports_backward_seek: bool,

    /// Backward seeks are expensive (e.g. they restart decompression)
    pub costly_seek: bool,

    /// The total size is below the configured memory budget
    pub is_size_bounded: bool,

    /// Total size in bytes, when known
    pub size: Option<u64>,
}

impl SourceCapabilities {
    /// An uncompressed file on disk that can be memory-mapped
    pub fn plain_file(size: u64, config: &ReaderConfig) -> Self {
        Self {
            supports_random_access: true,
            supports_backward_seek: true,
            costly_seek: false,
            is_size_bounded: size < config.max_mem,
            size: Some(size),
        }
    }

    /// A seekable stream that cannot be mapped
    pub fn seekable(size: u64, costly_seek: bool, config: &ReaderConfig) -> Self {
        Self {
            supports_random_access: false,
            supports_backward_seek: true,
            costly_seek,
            is_size_bounded: size < config.max_mem,
            size: Some(size),
        }
    }

    /// A stream that can only be read front to back, size unknown
    pub fn forward_only() -> Self {
        Self {
            supports_random_access: false,
            supports_backward_seek: false,
            costly_seek: true,
            is_size_bounded: false,
            size: None,
        }
    }
}

/// Operating mode of [`ReverseStreamReader`](crate::reader::ReverseStreamReader)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Read everything forward, then hand lines out from the back
    WholeReverse,
    /// Walk the source backwards `block_size` bytes at a time
    BlockScan { block_size: usize },
}

impl StreamMode {
    pub fn select(caps: &SourceCapabilities, config: &ReaderConfig) -> Self {
        if config.force_whole_reverse || caps.is_size_bounded || !caps.supports_backward_seek {
            return Self::WholeReverse;
        }

        let block_size = if caps.costly_seek {
            // Few large reads beat many small ones when every seek is expensive
            let remaining = caps.size.unwrap_or(config.max_mem);
            config.max_mem.min(remaining).max(1) as usize
        } else {
            config.block_size
        };

        Self::BlockScan { block_size }
    }
}

/// Which reader should handle a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    /// [`ReverseFileReader`](crate::reader::ReverseFileReader) over a byte range
    File,
    /// [`ReverseStreamReader`](crate::reader::ReverseStreamReader) in the given mode
    Stream(StreamMode),
}

impl ReaderKind {
    pub fn select(caps: &SourceCapabilities, config: &ReaderConfig) -> Self {
        let kind = if caps.supports_random_access {
            Self::File
        } else {
            Self::Stream(StreamMode::select(caps, config))
        };
        log::debug!("selected {kind:?} for {caps:?}");
        kind
    }
}
