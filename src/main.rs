//! revline - print a file's lines last to first
//!
//! Handles plain and compressed files of any size, optionally while holding the
//! file's `.lock` so cooperating writers stay out of the way.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use revline::{FileLock, LockConfig, ReaderConfig};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("revline")
        .version(revline::VERSION)
        .about("Print the lines of a file in reverse order")
        .long_about(
            "revline prints a file's lines last to first. Large files are memory-mapped \
             and compressed files (gzip, bzip2, xz, lzma, zstd) are decoded transparently.",
        )
        .arg(
            Arg::new("file")
                .help("Path to the file to read")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("lines")
                .short('n')
                .long("lines")
                .help("Stop after this many lines")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("lock")
                .long("lock")
                .help("Hold <FILE>.lock while reading")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Seconds to wait for the lock")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("delay")
                .long("delay")
                .help("Seconds between lock attempts")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("block-size")
                .long("block-size")
                .help("Bytes per backward read for large seekable sources")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("max-mem")
                .long("max-mem")
                .help("Sources below this many bytes are reversed in memory")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Configuration file (requires the `config` feature)")
                .value_parser(value_parser!(PathBuf)),
        )
        .get_matches();

    let file_path = matches
        .get_one::<PathBuf>("file")
        .cloned()
        .context("file argument is required")?;

    let (mut reader_config, mut lock_config) = load_config(matches.get_one::<PathBuf>("config"))?;
    if let Some(&block_size) = matches.get_one::<usize>("block-size") {
        reader_config.block_size = block_size;
    }
    if let Some(&max_mem) = matches.get_one::<u64>("max-mem") {
        reader_config.max_mem = max_mem;
    }
    if let Some(&timeout) = matches.get_one::<f64>("timeout") {
        lock_config.timeout_ms = seconds_to_millis(timeout)?;
    }
    if let Some(&delay) = matches.get_one::<f64>("delay") {
        lock_config.delay_ms = seconds_to_millis(delay)?;
    }

    let mut lock = if matches.get_flag("lock") {
        let mut lock = FileLock::with_config(&file_path, &lock_config)?;
        lock.acquire_async()
            .await
            .with_context(|| format!("Could not lock {}", file_path.display()))?;
        Some(lock)
    } else {
        None
    };

    let limit = matches.get_one::<usize>("lines").copied().unwrap_or(usize::MAX);
    let result = print_reversed(&file_path, &reader_config, limit);

    if let Some(lock) = lock.as_mut() {
        lock.release()?;
    }
    result
}

fn print_reversed(path: &Path, config: &ReaderConfig, limit: usize) -> Result<()> {
    let lines = revline::open_reverse(path, config)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    if let Some(diagnostic) = lines.diagnostic() {
        log::warn!("{}: {diagnostic}", path.display());
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for line in lines.take(limit) {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        match out.write_all(&line) {
            // Downstream closed early (e.g. `| head`)
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
            other => other?,
        }
    }
    match out.flush() {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        other => Ok(other?),
    }
}

fn seconds_to_millis(seconds: f64) -> Result<u64> {
    let duration = Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("Invalid duration: {seconds}"))?;
    Ok(duration.as_millis() as u64)
}

#[cfg(feature = "config")]
fn load_config(path: Option<&PathBuf>) -> Result<(ReaderConfig, LockConfig)> {
    let config = match path {
        Some(path) => revline::config::Config::load(path)?,
        None => revline::config::Config::load_default()?,
    };
    Ok((config.reader, config.lock))
}

#[cfg(not(feature = "config"))]
fn load_config(path: Option<&PathBuf>) -> Result<(ReaderConfig, LockConfig)> {
    if path.is_some() {
        anyhow::bail!("--config requires revline to be built with the `config` feature");
    }
    Ok((ReaderConfig::default(), LockConfig::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!revline::VERSION.is_empty());
    }

    #[test]
    fn test_seconds_to_millis() {
        assert_eq!(seconds_to_millis(0.2).unwrap(), 200);
        assert_eq!(seconds_to_millis(10.0).unwrap(), 10_000);
        assert!(seconds_to_millis(-1.0).is_err());
        assert!(seconds_to_millis(f64::NAN).is_err());
    }
}
