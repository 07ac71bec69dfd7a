//! Merging of settled values into the form result.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::error::FormError;
use crate::schema::FieldSpec;
use crate::value::{CollectedValue, FieldEntry, FormResult};

/// What to do with a value that just arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Process it; the number is its arrival sequence
    Accept(u64),
    /// A non-multiple key already has a value; ignore this one
    Drop,
    /// A strict non-multiple key already has a value
    Duplicate,
}

#[derive(Debug)]
enum Slot {
    One(CollectedValue),
    Many(Vec<(u64, CollectedValue)>),
}

/// Owns the values of one parse until they are published.
#[derive(Debug, Default)]
pub struct FieldCollector {
    claimed: HashSet<String>,
    slots: HashMap<String, Slot>,
    next_seq: u64,
}

impl FieldCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the arrival of a value for `spec`.
    ///
    /// A non-multiple key is occupied from its first arrival on, even while
    /// that value is still being validated or written.
    pub fn claim(&mut self, spec: &FieldSpec) -> Claim {
        if !spec.multiple && !self.claimed.insert(spec.key.clone()) {
            return if spec.strict_duplicate {
                Claim::Duplicate
            } else {
                Claim::Drop
            };
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        Claim::Accept(seq)
    }

    /// Store a validated value.
    ///
    /// Values of a multiple key are kept in arrival order regardless of the
    /// order in which they settle.
    pub fn merge(
        &mut self,
        spec: &FieldSpec,
        seq: u64,
        value: CollectedValue,
    ) -> Result<(), FormError> {
        if spec.multiple {
            // Multiplicity is fixed per key, so a multiple key only ever has a `Many` slot.
            let slot = self
                .slots
                .entry(spec.key.clone())
                .or_insert_with(|| Slot::Many(Vec::new()));
            if let Slot::Many(values) = slot {
                let pos = values.partition_point(|(s, _)| *s < seq);
                values.insert(pos, (seq, value));
            }
            return Ok(());
        }

        if self.slots.contains_key(&spec.key) {
            return if spec.strict_duplicate {
                Err(FormError::DuplicateNotAllowed {
                    key: spec.key.clone(),
                })
            } else {
                Ok(())
            };
        }
        self.claimed.insert(spec.key.clone());
        self.slots.insert(spec.key.clone(), Slot::One(value));
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Paths of every merged disk file.
    pub fn disk_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for slot in self.slots.values() {
            match slot {
                Slot::One(value) => paths.extend(value.path().map(PathBuf::from)),
                Slot::Many(values) => {
                    paths.extend(values.iter().filter_map(|(_, v)| v.path().map(PathBuf::from)))
                }
            }
        }
        paths
    }

    pub fn publish(self) -> FormResult {
        let entries = self
            .slots
            .into_iter()
            .map(|(key, slot)| {
                let entry = match slot {
                    Slot::One(value) => FieldEntry::One(value),
                    Slot::Many(values) => FieldEntry::Many(values.into_iter().map(|(_, v)| v).collect()),
                };
                (key, entry)
            })
            .collect();
        FormResult::from_entries(entries)
    }
}
