//! Tunables for the readers and the lock.
//!
//! Both structs have sensible defaults and can be built in code. With the
//! `config` feature enabled they can also be loaded from a TOML file:
//!
//! ```toml
//! [reader]
//! block_size = 4096
//! max_mem = 4000000
//!
//! [lock]
//! timeout_ms = 10000
//! delay_ms = 50
//! ```

use crate::error::{Result, RevlineError};
use std::time::Duration;

/// Reader memory budget and block sizing
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ReaderConfig {
    /// Bytes read per backward step in block-wise mode
    pub block_size: usize,

    /// Sources smaller than this are reversed entirely in memory
    pub max_mem: u64,

    /// Always reverse in memory, regardless of size or seekability
    pub force_whole_reverse: bool,
}

impl ReaderConfig {
    pub const DEFAULT_BLOCK_SIZE: usize = 4096;
    pub const DEFAULT_MAX_MEM: u64 = 4_000_000;

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(RevlineError::config("block_size must be at least 1 byte"));
        }
        if self.max_mem == 0 {
            return Err(RevlineError::config("max_mem must be at least 1 byte"));
        }
        Ok(())
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            block_size: Self::DEFAULT_BLOCK_SIZE,
            max_mem: Self::DEFAULT_MAX_MEM,
            // Negative seeks are slow enough on Windows that reversing in memory wins
            force_whole_reverse: cfg!(windows),
        }
    }
}

/// Polling parameters for [`FileLock`](crate::lock::FileLock)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct LockConfig {
    pub timeout_ms: u64,
    pub delay_ms: u64,
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            delay_ms: 50,
        }
    }
}

/// Top-level configuration file layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct Config {
    pub reader: ReaderConfig,
    pub lock: LockConfig,
}

#[cfg(feature = "config")]
impl Config {
    /// `<config dir>/revline/config.toml`, if the platform has a config dir
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("revline").join("config.toml"))
    }

    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| RevlineError::config(e.to_string()))?;
        config.reader.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RevlineError::file_error(format!("Failed to read config: {}", path.display()), e)
        })?;
        Self::from_toml(&text)
    }

    /// Load the default configuration file, falling back to defaults when absent
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("loading configuration from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}
