//! Scripted in-memory source for testing.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::{FilePart, MultipartSource, SourceEvent};

/// Replays a fixed list of events, then `End`.
#[derive(Debug, Default)]
pub struct MemorySource {
    events: VecDeque<SourceEvent>,
    detached: bool,
}

impl MemorySource {
    pub fn new(events: Vec<SourceEvent>) -> Self {
        Self {
            events: events.into(),
            detached: false,
        }
    }

    /// A source carrying only text fields.
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            fields
                .into_iter()
                .map(|(k, v)| SourceEvent::field(k, v))
                .collect(),
        )
    }

    pub fn push_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.events.push_back(SourceEvent::field(key, value));
        self
    }

    pub fn push_file(mut self, key: impl Into<String>, part: FilePart) -> Self {
        self.events.push_back(SourceEvent::file(key, part));
        self
    }

    pub fn push(mut self, event: SourceEvent) -> Self {
        self.events.push_back(event);
        self
    }

    /// Whether a parse detached this source after failing.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Events not yet delivered.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl MultipartSource for MemorySource {
    async fn next_event(&mut self) -> SourceEvent {
        self.events.pop_front().unwrap_or(SourceEvent::End)
    }

    async fn detach(&mut self) {
        self.detached = true;
        self.events.clear();
    }
}
