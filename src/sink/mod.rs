//! Sinks consuming the byte stream of one file part.
//!
//! This module provides:
//! - `DiskSink`: streams bytes into a file, unlinking it on failure
//! - `BufferSink`: concatenates bytes in memory, then decodes and converts them
//! - `CallbackSink`: hands the stream to a caller-supplied `StreamConsumer`
//! - `temp_file_path`: process-unique temporary file naming
//!
//! Every sink counts bytes as they arrive and fails with
//! `FormError::SizeLimitExceeded` as soon as the count passes the field's
//! `max_size`.

mod buffer;
mod callback;
mod disk;
mod temp;

pub use buffer::BufferSink;
pub use callback::{CallbackSink, StreamConsumer};
pub use disk::DiskSink;
pub(crate) use disk::remove_quietly;
pub use temp::temp_file_path;

use crate::error::FormError;
use crate::schema::SizeLimit;

/// Running byte count of one part, checked against its limit.
#[derive(Debug, Clone)]
pub(crate) struct SizeCounter {
    key: String,
    size: u64,
    limit: Option<SizeLimit>,
}

impl SizeCounter {
    pub(crate) fn new(key: impl Into<String>, limit: Option<SizeLimit>) -> Self {
        Self {
            key: key.into(),
            size: 0,
            limit,
        }
    }

    /// Count `n` more bytes; fails once the total exceeds the limit.
    pub(crate) fn add(&mut self, n: usize) -> Result<(), FormError> {
        self.size += n as u64;
        match &self.limit {
            Some(limit) if self.size > limit.bytes => Err(size_error(&self.key, limit)),
            _ => Ok(()),
        }
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }
}

pub(crate) fn size_error(key: &str, limit: &SizeLimit) -> FormError {
    FormError::SizeLimitExceeded {
        key: key.to_string(),
        detail: limit.message().to_string(),
    }
}
