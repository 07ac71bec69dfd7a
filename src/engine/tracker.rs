//! Global completion tracking for a parse session.

use tracing::debug;

use super::FieldCollector;
use crate::error::FormError;
use crate::schema::Schema;

/// Knows when a parse has nothing left to wait for.
///
/// Done fires exactly once, the first time no unit is pending, the source has
/// ended and no error has been reported. Both the unit and end-of-stream call
/// sites run the same check, so their relative order does not matter.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    pending: usize,
    decoder_finished: bool,
    errored: bool,
    done: bool,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A rule chain or file part started.
    pub fn begin(&mut self) {
        self.pending += 1;
    }

    /// A unit settled. Returns `true` if this completes the parse.
    pub fn complete(&mut self) -> bool {
        self.pending = self.pending.saturating_sub(1);
        self.check()
    }

    /// The source signalled end-of-stream. Returns `true` if this completes
    /// the parse.
    pub fn finish_decoder(&mut self) -> bool {
        self.decoder_finished = true;
        self.check()
    }

    /// Flag the session as failed. Only the first call returns `true`.
    pub fn mark_errored(&mut self) -> bool {
        !std::mem::replace(&mut self.errored, true)
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_errored(&self) -> bool {
        self.errored
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn check(&mut self) -> bool {
        if self.done || self.errored || self.pending > 0 || !self.decoder_finished {
            return false;
        }
        self.done = true;
        debug!("form complete");
        true
    }
}

/// Check required fields in declaration order.
///
/// Fails on the first required key, by declaration order, that collected no
/// value.
pub fn finalize(schema: &Schema, collector: &FieldCollector) -> Result<(), FormError> {
    match schema
        .fields()
        .iter()
        .find(|spec| spec.required && !collector.contains(&spec.key))
    {
        Some(spec) => Err(FormError::RequiredFieldMissing {
            key: spec.key.clone(),
        }),
        None => Ok(()),
    }
}

