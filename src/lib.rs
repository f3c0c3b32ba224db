//! # revline - Backward Line Reading and Lock Files
//!
//! Reads the lines of a file last-to-first without loading it whole, including
//! files that are only available as a forward-only decompression stream, and
//! provides a cross-process lock built purely on exclusive file creation.
//!
//! ## Features
//!
//! - **Large File Support**: memory-mapped backward scans with a bounded working set
//! - **Streams**: whole-reverse for forward-only decoders, block-wise scans for
//!   large seekable sources
//! - **Compression Support**: transparent gzip, bzip2, xz, lzma and zstd
//! - **Byte Accuracy**: every line keeps its own terminator, so reversing the
//!   output reproduces the input exactly
//! - **File Locks**: `<path>.lock` mutex with polling, timeout and scoped guards
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - Reader and lock tunables, optionally loaded from TOML
//! - [`reader`] - Line ending detection, reverse readers and reader selection
//! - [`lock`] - Exclusive-create file lock
//!
//! ```no_run
//! use revline::reader::open_reverse;
//! use revline::ReaderConfig;
//! use std::path::Path;
//!
//! for line in open_reverse(Path::new("app.log.gz"), &ReaderConfig::default())?.take(10) {
//!     print!("{}", line?);
//! }
//! # Ok::<(), revline::RevlineError>(())
//! ```

// Core modules
pub mod config;
pub mod error;

// Components
pub mod lock;
#[cfg(unix)]
pub mod process;
pub mod reader;

// Re-export commonly used types for convenience
pub use config::{LockConfig, ReaderConfig};
pub use error::{Result, RevlineError};

// Public API surface for external usage
pub use lock::{FileLock, LockGuard};
pub use reader::{
    open_reverse, LineEnding, ReverseFileReader, ReverseLines, ReverseStreamReader,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
