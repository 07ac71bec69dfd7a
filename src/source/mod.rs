//! The multipart decoder seen as a source of form events.
//!
//! This module provides:
//! - `MultipartSource`: trait for anything that yields field/file/error/end events
//! - `SourceEvent` and `FilePart`: the events and the byte stream of one file part
//! - `UpstreamPipe`: the transport feeding a source, severed on failure
//! - `ChannelSource` / `SourceHandle`: a channel-backed source
//! - `MemorySource`: a scripted source for tests

mod channel;
mod memory;

pub use channel::{ChannelSource, SourceHandle};
pub use memory::MemorySource;

use std::fmt;
use std::io;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};

/// Bytes of one file part, in stream order.
pub type ByteStream = BoxStream<'static, io::Result<Vec<u8>>>;

/// One file part as emitted by the decoder.
pub struct FilePart {
    stream: ByteStream,
    filename: Option<String>,
    content_type: Option<String>,
}

impl FilePart {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Vec<u8>>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
            filename: None,
            content_type: None,
        }
    }

    /// A part whose body is already known, split into `chunks`.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(chunks.into_iter().map(Ok)))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_chunks(std::iter::once(bytes.into()))
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Client-supplied file name, if the part carried one.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn into_stream(self) -> ByteStream {
        self.stream
    }
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum SourceEvent {
    Field { key: String, value: String },
    File { key: String, part: FilePart },
    Error(io::Error),
    /// End of the submission; no events follow
    End,
}

impl SourceEvent {
    pub fn field(key: impl Into<String>, value: impl Into<String>) -> Self {
        SourceEvent::Field {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn file(key: impl Into<String>, part: FilePart) -> Self {
        SourceEvent::File {
            key: key.into(),
            part,
        }
    }
}

/// A decoder producing form events.
///
/// Implementations must yield nothing after `Error` or `End`.
/// `next_event` is raced against in-flight work, so it must be cancel-safe:
/// dropping its future before completion must not lose an event.
#[async_trait]
pub trait MultipartSource: Send {
    async fn next_event(&mut self) -> SourceEvent;

    /// Stop delivering events after a failed parse and release whatever
    /// feeds the source.
    async fn detach(&mut self) {}
}

#[async_trait]
impl<S: MultipartSource + ?Sized> MultipartSource for &mut S {
    async fn next_event(&mut self) -> SourceEvent {
        (**self).next_event().await
    }

    async fn detach(&mut self) {
        (**self).detach().await
    }
}

/// The transport feeding a source, e.g. a request body piped into a decoder.
pub trait UpstreamPipe: Send {
    /// Disconnect the transport from the decoder.
    fn sever(&mut self);

    /// Whether the transport still has data to deliver.
    fn is_readable(&self) -> bool;

    /// Let a severed transport keep flowing so it is not left stalled.
    fn resume(&mut self);
}
