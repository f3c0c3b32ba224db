//! Process introspection helpers.

use crate::error::{Result, RevlineError};
use std::path::Path;

/// Number of file descriptors currently open in this process
///
/// Only available on Unix-like systems. The descriptor used to list the
/// directory itself is not counted.
#[cfg(unix)]
pub fn open_fd_count() -> Result<usize> {
    let dir = if Path::new("/proc/self/fd").is_dir() {
        Path::new("/proc/self/fd")
    } else {
        Path::new("/dev/fd")
    };

    let entries = std::fs::read_dir(dir)
        .map_err(|e| RevlineError::file_error(format!("Failed to list {}", dir.display()), e))?;

    let mut count = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| RevlineError::file_error("Failed to read fd entry", e))?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.parse::<u32>().is_ok())
        {
            count += 1;
        }
    }

    Ok(count.saturating_sub(1))
}
