//! Error types and handling infrastructure for revline.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! the library error type. The binary layers `anyhow` context on top.
//!
//! Only two conditions are deliberately *not* errors: an empty input file and a
//! zero-length mapping. Both degrade to an empty line sequence and are reported
//! through [`Diagnostic`](crate::reader::Diagnostic) instead.

use bstr::BString;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The main error type for revline operations.
#[derive(Error, Debug)]
pub enum RevlineError {
    /// The first line of a file carries neither `\n` nor `\r\n`
    #[error("Unknown line ending in line {first_line:?}")]
    UnknownLineEnding { first_line: BString },

    /// Exclusive creation of the lock file kept failing until the timeout elapsed
    #[error("{}: Timeout occurred after {timeout:?}", lock_path.display())]
    LockTimeout { lock_path: PathBuf, timeout: Duration },

    /// Any lock file failure other than "already exists"
    #[error("Lock file operation failed on {}: {source}", lock_path.display())]
    LockSystem {
        lock_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `delay`/`timeout` violate `0 < delay <= timeout`
    #[error("Invalid lock configuration: {message}")]
    LockConfig { message: String },

    /// File system related errors (file not found, permission denied, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Memory mapping related errors
    #[error("Memory mapping failed: {message}")]
    MemoryMappingError { message: String },

    /// Compression format detection or decompression errors
    #[error("Compression error: {message}")]
    CompressionError { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid command line arguments or option values
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

/// Standard Result type for revline operations.
pub type Result<T> = std::result::Result<T, RevlineError>;

impl RevlineError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a MemoryMappingError with a descriptive message
    pub fn memory_mapping(message: impl Into<String>) -> Self {
        Self::MemoryMappingError {
            message: message.into(),
        }
    }

    /// Create a CompressionError with a descriptive message
    pub fn compression(message: impl Into<String>) -> Self {
        Self::CompressionError {
            message: message.into(),
        }
    }

    /// Create a LockConfig error with a descriptive message
    pub fn lock_config(message: impl Into<String>) -> Self {
        Self::LockConfig {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create an InvalidArgument error with a descriptive message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// True for the error produced when a lock could not be taken in time
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

// Automatic conversion from io::Error to RevlineError
impl From<std::io::Error> for RevlineError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}
