//! Cross-process mutual exclusion through exclusive file creation.
//!
//! A [`FileLock`] guards a path by creating `<absolute path>.lock` with
//! create-new semantics. Whoever manages to create the file holds the lock;
//! everybody else polls until the file disappears or their timeout elapses. No
//! `flock`/`LockFileEx` is involved, so the protocol works wherever exclusive
//! creation is atomic: local POSIX and NTFS volumes, but not every network
//! file system.
//!
//! # Limitations
//!
//! - Polling, not blocking: the worst-case wait is `timeout` plus one `delay`
//! - A process that dies while holding the lock leaves the lock file behind;
//!   it has to be removed by an operator or an expiry policy on top of this
//! - Not re-entrant beyond the in-process `is_locked` flag
//!
//! # Example
//!
//! ```no_run
//! use revline::lock::FileLock;
//! use std::time::Duration;
//!
//! let mut lock = FileLock::new("shared.db", Duration::from_secs(5), Duration::from_millis(50))?;
//! {
//!     let _guard = lock.lock()?;
//!     // critical section
//! }
//! assert!(!lock.is_locked());
//! # Ok::<(), revline::RevlineError>(())
//! ```

use crate::config::LockConfig;
use crate::error::{Result, RevlineError};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of one exclusive-create attempt
enum Attempt {
    Acquired(File),
    Busy,
}

/// Lock on a guarded path, backed by a sibling `.lock` file
#[derive(Debug)]
pub struct FileLock {
    guarded_path: PathBuf,
    lock_path: PathBuf,
    timeout: Duration,
    delay: Duration,

    /// Handle on the lock file while we hold it
    handle: Option<File>,
}

impl FileLock {
    /// Prepare a lock for `path`; nothing is created until [`acquire`](Self::acquire)
    ///
    /// Fails with [`RevlineError::LockConfig`] unless `0 < delay <= timeout`.
    pub fn new(path: impl AsRef<Path>, timeout: Duration, delay: Duration) -> Result<Self> {
        if delay.is_zero() || timeout.is_zero() || delay > timeout {
            return Err(RevlineError::lock_config(format!(
                "delay and timeout must be positive with delay <= timeout (delay {delay:?}, timeout {timeout:?})"
            )));
        }

        let guarded_path = absolute(path.as_ref())?;
        let lock_path = lock_path_for(&guarded_path);
        Ok(Self {
            guarded_path,
            lock_path,
            timeout,
            delay,
            handle: None,
        })
    }

    pub fn with_config(path: impl AsRef<Path>, config: &LockConfig) -> Result<Self> {
        Self::new(path, config.timeout(), config.delay())
    }

    /// The path this lock guards, made absolute
    pub fn guarded_path(&self) -> &Path {
        &self.guarded_path
    }

    /// The `.lock` file whose existence signals ownership
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn is_locked(&self) -> bool {
        self.handle.is_some()
    }

    fn try_create(&self) -> Result<Attempt> {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
        {
            Ok(file) => Ok(Attempt::Acquired(file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(Attempt::Busy),
            Err(source) => Err(RevlineError::LockSystem {
                lock_path: self.lock_path.clone(),
                source,
            }),
        }
    }

    fn timed_out(&self) -> RevlineError {
        RevlineError::LockTimeout {
            lock_path: self.lock_path.clone(),
            timeout: self.timeout,
        }
    }

    /// Take the lock, polling every `delay` until `timeout` has elapsed
    ///
    /// A no-op when this handle already holds the lock.
    pub fn acquire(&mut self) -> Result<()> {
        if self.is_locked() {
            return Ok(());
        }

        let started = Instant::now();
        loop {
            match self.try_create()? {
                Attempt::Acquired(file) => {
                    self.handle = Some(file);
                    log::debug!("acquired {}", self.lock_path.display());
                    return Ok(());
                }
                Attempt::Busy => {
                    if started.elapsed() >= self.timeout {
                        return Err(self.timed_out());
                    }
                    log::trace!("{} busy, retrying in {:?}", self.lock_path.display(), self.delay);
                    std::thread::sleep(self.delay);
                }
            }
        }
    }

    /// [`acquire`](Self::acquire) without blocking the async runtime between polls
    pub async fn acquire_async(&mut self) -> Result<()> {
        if self.is_locked() {
            return Ok(());
        }

        let started = Instant::now();
        loop {
            match self.try_create()? {
                Attempt::Acquired(file) => {
                    self.handle = Some(file);
                    log::debug!("acquired {}", self.lock_path.display());
                    return Ok(());
                }
                Attempt::Busy => {
                    if started.elapsed() >= self.timeout {
                        return Err(self.timed_out());
                    }
                    log::trace!("{} busy, retrying in {:?}", self.lock_path.display(), self.delay);
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }

    /// Give the lock up by deleting the lock file; a no-op when not held
    pub fn release(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        drop(handle);

        std::fs::remove_file(&self.lock_path).map_err(|source| RevlineError::LockSystem {
            lock_path: self.lock_path.clone(),
            source,
        })?;
        log::debug!("released {}", self.lock_path.display());
        Ok(())
    }

    /// Acquire and return a guard that releases on every exit path
    pub fn lock(&mut self) -> Result<LockGuard<'_>> {
        self.acquire()?;
        Ok(LockGuard { lock: self })
    }

    /// Async counterpart of [`lock`](Self::lock)
    pub async fn lock_async(&mut self) -> Result<LockGuard<'_>> {
        self.acquire_async().await?;
        Ok(LockGuard { lock: self })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("failed to release lock on drop: {e}");
        }
    }
}

/// Scoped ownership of a [`FileLock`]; releases when dropped
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a mut FileLock,
}

impl LockGuard<'_> {
    pub fn lock_path(&self) -> &Path {
        self.lock.lock_path()
    }

    /// Release now and surface any error instead of logging it
    pub fn release(self) -> Result<()> {
        // Drop then finds the lock already released
        self.lock.release()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release() {
            log::warn!("failed to release lock: {e}");
        }
    }
}

/// `<guarded path>.lock`, next to the guarded file
pub fn lock_path_for(guarded_path: &Path) -> PathBuf {
    let mut name = guarded_path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| RevlineError::file_error("Failed to resolve current directory", e))?;
    Ok(cwd.join(path))
}
