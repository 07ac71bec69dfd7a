//! Temporary file naming.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(1);

/// A fresh path `<dir>/<prefix><unix-millis>.<counter><suffix>`.
///
/// The counter is process-global, so two calls never return the same path
/// even within the same millisecond or across concurrent parses.
pub fn temp_file_path(dir: &Path, prefix: &str, suffix: &str) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("{prefix}{millis}.{n}{suffix}"))
}
