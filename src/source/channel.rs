//! Channel-backed multipart source.

use std::fmt;
use std::io;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::{FilePart, MultipartSource, SourceEvent, UpstreamPipe};

/// Sending half of a [`ChannelSource`], held by the decoder.
///
/// Each method returns `false` once the source has been detached.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    tx: mpsc::UnboundedSender<SourceEvent>,
}

impl SourceHandle {
    pub fn send(&self, event: SourceEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn field(&self, key: impl Into<String>, value: impl Into<String>) -> bool {
        self.send(SourceEvent::field(key, value))
    }

    pub fn file(&self, key: impl Into<String>, part: FilePart) -> bool {
        self.send(SourceEvent::file(key, part))
    }

    pub fn error(&self, error: io::Error) -> bool {
        self.send(SourceEvent::Error(error))
    }

    pub fn end(&self) -> bool {
        self.send(SourceEvent::End)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A source fed through an unbounded channel.
///
/// Dropping every [`SourceHandle`] without sending `End` is reported as a
/// decoder error.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<SourceEvent>,
    upstream: Option<Box<dyn UpstreamPipe>>,
}

impl ChannelSource {
    pub fn channel() -> (SourceHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SourceHandle { tx },
            Self { rx, upstream: None },
        )
    }

    /// Attach the transport that feeds this source.
    pub fn with_upstream(mut self, upstream: Box<dyn UpstreamPipe>) -> Self {
        self.upstream = Some(upstream);
        self
    }
}

impl fmt::Debug for ChannelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSource")
            .field("upstream", &self.upstream.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MultipartSource for ChannelSource {
    async fn next_event(&mut self) -> SourceEvent {
        match self.rx.recv().await {
            Some(event) => event,
            None => SourceEvent::Error(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "multipart source closed before end of form",
            )),
        }
    }

    async fn detach(&mut self) {
        self.rx.close();
        if let Some(mut upstream) = self.upstream.take() {
            upstream.sever();
            if upstream.is_readable() {
                debug!("resuming severed upstream");
                upstream.resume();
            }
        }
    }
}
