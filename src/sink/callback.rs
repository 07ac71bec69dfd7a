//! Callback sink: the caller consumes the stream, we only count bytes.

use std::fmt::Debug;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use tokio::sync::oneshot;
use tracing::debug;

use super::size_error;
use crate::error::FormError;
use crate::schema::SizeLimit;
use crate::source::ByteStream;
use crate::value::CollectedValue;

/// Caller-supplied consumer of a file part's bytes.
#[async_trait]
pub trait StreamConsumer: Send + Sync + Debug {
    /// Consume the part's stream. An error fails the whole form.
    async fn consume(&self, key: &str, stream: ByteStream) -> io::Result<()>;
}

#[derive(Debug, Default)]
struct Tally {
    bytes: AtomicU64,
    exceeded: AtomicBool,
}

/// Counts bytes on their way to the consumer and cuts the stream off once
/// the limit is passed.
///
/// `finished` fires only when the inner stream is read to its end; dropping
/// the tap early closes it instead.
struct CountingTap {
    inner: ByteStream,
    tally: Arc<Tally>,
    limit: Option<u64>,
    tripped: Option<oneshot::Sender<()>>,
    finished: Option<oneshot::Sender<()>>,
    done: bool,
}

impl Stream for CountingTap {
    type Item = io::Result<Vec<u8>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                let len = chunk.len() as u64;
                let total = self.tally.bytes.fetch_add(len, Ordering::Relaxed) + len;
                if self.limit.is_some_and(|limit| total > limit) {
                    self.done = true;
                    self.finished = None;
                    self.tally.exceeded.store(true, Ordering::Relaxed);
                    if let Some(tx) = self.tripped.take() {
                        let _ = tx.send(());
                    }
                    return Poll::Ready(Some(Err(io::Error::other("size limit exceeded"))));
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                self.done = true;
                if let Some(tx) = self.finished.take() {
                    let _ = tx.send(());
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

/// Hands a file part to a [`StreamConsumer`].
#[derive(Debug)]
pub struct CallbackSink {
    key: String,
    consumer: Arc<dyn StreamConsumer>,
    limit: Option<SizeLimit>,
}

impl CallbackSink {
    pub fn new(key: &str, consumer: Arc<dyn StreamConsumer>, limit: Option<SizeLimit>) -> Self {
        Self {
            key: key.to_string(),
            consumer,
            limit,
        }
    }

    /// Run the consumer; the result carries the number of bytes pulled.
    ///
    /// The part resolves once the consumer has returned and the stream has
    /// been read to its end, so a consumer that hands the stream to another
    /// task is still counted and limited. Exceeding the limit fails the part
    /// immediately, without waiting for the consumer to return.
    pub async fn consume(self, stream: ByteStream) -> Result<CollectedValue, FormError> {
        let tally = Arc::new(Tally::default());
        let (trip_tx, mut tripped) = oneshot::channel();
        let (end_tx, mut ended) = oneshot::channel();
        let tap = CountingTap {
            inner: stream,
            tally: Arc::clone(&tally),
            limit: self.limit.as_ref().map(|l| l.bytes),
            tripped: Some(trip_tx),
            finished: Some(end_tx),
            done: false,
        };

        let mut consumed = self.consumer.consume(&self.key, tap.boxed());
        let mut trip_open = true;
        let mut consumer_done = false;
        let mut stream_done = false;

        while !(consumer_done && stream_done) {
            tokio::select! {
                biased;
                trip = &mut tripped, if trip_open => match trip {
                    Ok(()) => return Err(self.over_limit()),
                    Err(_) => trip_open = false,
                },
                result = &mut consumed, if !consumer_done => match result {
                    Ok(()) => consumer_done = true,
                    Err(e) => {
                        if tally.exceeded.load(Ordering::Relaxed) {
                            return Err(self.over_limit());
                        }
                        return Err(FormError::sink_io(&self.key, e));
                    }
                },
                end = &mut ended, if !stream_done => match end {
                    Ok(()) => stream_done = true,
                    Err(_) if tally.exceeded.load(Ordering::Relaxed) => {
                        return Err(self.over_limit());
                    }
                    Err(_) => {
                        return Err(FormError::sink_io(
                            &self.key,
                            io::Error::other("stream dropped before its end"),
                        ));
                    }
                },
            }
        }

        let size = tally.bytes.load(Ordering::Relaxed);
        debug!(key = %self.key, size, "stream consumer finished");
        Ok(CollectedValue::StreamedFile { size })
    }

    fn over_limit(&self) -> FormError {
        match &self.limit {
            Some(limit) => size_error(&self.key, limit),
            None => FormError::sink_io(&self.key, io::Error::other("size limit exceeded")),
        }
    }
}
