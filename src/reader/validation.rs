//! File validation utilities for ensuring paths are suitable for reading.
//!
//! Unlike a viewer, a reverse reader has no reason to refuse empty files: they
//! simply produce no lines. Validation is limited to existence, file type and
//! readability, so that callers get a precise error before any mapping happens.

use crate::error::{Result, RevlineError};
use std::fs::File;
use std::path::Path;

/// Validate that a file path is accessible and suitable for reading
///
/// # Error Cases
/// - File does not exist
/// - Path points to a directory or other non-regular file
/// - File is not readable due to permissions
pub fn validate_file_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(RevlineError::file_error(
            format!("File does not exist: {}", path.display()),
            std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"),
        ));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| RevlineError::file_error("Failed to read file metadata", e))?;

    if !metadata.is_file() {
        return Err(RevlineError::file_error(
            format!("Path is not a file: {}", path.display()),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Not a file"),
        ));
    }

    // Try to open the file to verify read permissions
    File::open(path).map_err(|e| RevlineError::file_error("Cannot open file for reading", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    /// Create a test file with specific content
    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content)
            .expect("Failed to write test content");
        file.flush().expect("Failed to flush test file");
        file
    }

    #[test]
    fn test_validate_valid_file() {
        let test_file = create_test_file(b"line 1\nline 2\n");
        assert!(validate_file_path(test_file.path()).is_ok());
    }

    #[test]
    fn test_validate_empty_file_is_accepted() {
        let empty_file = create_test_file(&[]);
        assert!(validate_file_path(empty_file.path()).is_ok());
    }

    #[test]
    fn test_validate_nonexistent_file() {
        let non_existent = Path::new("/this/file/does/not/exist.log");
        match validate_file_path(non_existent).unwrap_err() {
            RevlineError::FileError { message, .. } => {
                assert!(message.contains("File does not exist"));
            }
            _ => panic!("Expected FileError for non-existent file"),
        }
    }

    #[test]
    fn test_validate_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        match validate_file_path(temp_dir.path()).unwrap_err() {
            RevlineError::FileError { message, .. } => {
                assert!(message.contains("Path is not a file"));
            }
            _ => panic!("Expected FileError for directory"),
        }
    }
}
