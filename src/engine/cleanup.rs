//! One-shot failure path of a parse session.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use super::CompletionTracker;
use crate::error::FormError;
use crate::sink::remove_quietly;
use crate::source::MultipartSource;

/// Disk files written by units that have not been merged yet.
///
/// A file stays registered until its value reaches the collector, so a file
/// whose rules failed is still removed on cleanup.
#[derive(Debug, Default)]
pub struct InFlightFiles {
    by_unit: HashMap<u64, PathBuf>,
}

impl InFlightFiles {
    pub fn register(&mut self, unit: u64, path: PathBuf) {
        self.by_unit.insert(unit, path);
    }

    /// Forget the file of a unit whose value was merged or that never wrote one.
    pub fn release(&mut self, unit: u64) -> Option<PathBuf> {
        self.by_unit.remove(&unit)
    }

    pub fn len(&self) -> usize {
        self.by_unit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_unit.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = PathBuf> + '_ {
        self.by_unit.drain().map(|(_, path)| path)
    }
}

/// Unwinds a failed parse exactly once.
///
/// The first report wins; later reports are discarded. Unwinding removes
/// every file the parse wrote and detaches the source. Removal errors are
/// logged and swallowed so the unwind cannot fail past the original error.
#[derive(Debug, Default)]
pub struct ErrorCleanup {
    unwound: bool,
}

impl ErrorCleanup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. Returns `true` only for the first one.
    pub fn report(&mut self, tracker: &mut CompletionTracker, error: &FormError) -> bool {
        if tracker.mark_errored() {
            warn!(key = error.key(), kind = %error.kind(), error = %error, "form parse failed");
            true
        } else {
            debug!(key = error.key(), kind = %error.kind(), "discarding error after failure");
            false
        }
    }

    /// Remove `files` and detach `source`. Does nothing after the first call.
    ///
    /// Callers must drop in-flight units before unwinding so no stream is
    /// still writing to a file being removed.
    pub async fn unwind<S>(&mut self, files: Vec<PathBuf>, source: &mut S)
    where
        S: MultipartSource + ?Sized,
    {
        if std::mem::replace(&mut self.unwound, true) {
            return;
        }
        for path in &files {
            remove_quietly(path).await;
        }
        source.detach().await;
        debug!(removed = files.len(), "cleanup finished");
    }

    pub fn is_unwound(&self) -> bool {
        self.unwound
    }
}
