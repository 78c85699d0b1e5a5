//! Shared helpers: one-time tracing setup and file operations that retry on
//! transient I/O errors (AV scanners, sharing violations, flaky network volumes).

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// Transient OS errors worth another attempt:
/// access denied / sharing / lock violations (5, 32, 33), AV block (225),
/// device not ready or externally altered (21, 433, 1006, 1117, 1224).
fn is_retriable_io_error(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(5 | 21 | 32 | 33 | 225 | 433 | 1006 | 1117 | 1224)
    ) || e.kind() == io::ErrorKind::Interrupted
}

/// Run `op` up to `tries` times, sleeping `delay_ms * attempt` between retriable failures.
fn retry_io<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let tries = tries.max(1);
    let mut attempt = 1usize;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < tries && is_retriable_io_error(&e) => {
                sleep(Duration::from_millis(delay_ms.saturating_mul(attempt as u64)));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    retry_io(tries, delay_ms, || File::open(path))
}

pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    retry_io(tries, delay_ms, || File::create(path))
}

/// Remove a file; a missing file counts as success.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    retry_io(tries, delay_ms, || match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
    .with_context(|| format!("remove {}", path.display()))
}

/// Promote `tmp` to `dest`, replacing any existing file.
/// Falls back to copy + remove when the rename itself keeps failing.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let (tries, delay_ms) = (20usize, 50u64);
    if dest.exists() {
        remove_with_backoff(dest, tries, delay_ms)?;
    }
    if retry_io(tries, delay_ms, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    retry_io(tries, delay_ms, || fs::copy(tmp, dest))
        .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    remove_with_backoff(tmp, tries, delay_ms)
}
