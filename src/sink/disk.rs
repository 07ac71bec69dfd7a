//! Disk sink.

use std::io;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::SizeCounter;
use crate::error::FormError;
use crate::schema::SizeLimit;
use crate::source::ByteStream;
use crate::value::CollectedValue;

/// Streams a file part into a file on disk.
#[derive(Debug)]
pub struct DiskSink {
    path: PathBuf,
    file: File,
    counter: SizeCounter,
}

impl DiskSink {
    /// Create (or truncate) the file at `path`.
    pub async fn create(
        key: &str,
        path: PathBuf,
        limit: Option<SizeLimit>,
    ) -> Result<Self, FormError> {
        let file = File::create(&path)
            .await
            .map_err(|e| FormError::sink_io(key, e))?;
        debug!(key, path = %path.display(), "opened disk sink");
        Ok(Self {
            path,
            file,
            counter: SizeCounter::new(key, limit),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole stream, then close the file.
    ///
    /// On any failure the file is closed and removed before the error is
    /// returned.
    pub async fn consume(mut self, mut stream: ByteStream) -> Result<CollectedValue, FormError> {
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let err = FormError::sink_io(self.counter.key(), e);
                    return Err(self.abort(err).await);
                }
            };
            if let Err(err) = self.counter.add(chunk.len()) {
                return Err(self.abort(err).await);
            }
            if let Err(e) = self.file.write_all(&chunk).await {
                let err = FormError::sink_io(self.counter.key(), e);
                return Err(self.abort(err).await);
            }
        }

        if let Err(e) = self.file.flush().await {
            let err = FormError::sink_io(self.counter.key(), e);
            return Err(self.abort(err).await);
        }

        let Self {
            path,
            file,
            counter,
        } = self;
        drop(file);
        debug!(key = counter.key(), size = counter.size(), "disk sink finished");
        Ok(CollectedValue::DiskFile {
            path,
            size: counter.size(),
        })
    }

    async fn abort(self, err: FormError) -> FormError {
        let Self { path, mut file, .. } = self;
        // Let any pending write land before the handle goes away.
        let _ = file.flush().await;
        drop(file);
        remove_quietly(&path).await;
        err
    }
}

/// Unlink `path`, ignoring a file that was never created or is already gone.
pub(crate) async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove file"),
    }
}
