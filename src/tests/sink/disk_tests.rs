//! Tests for the disk sink.

use std::io;

use futures::stream::{self, StreamExt};

use crate::error::ErrorKind;
use crate::schema::SizeLimit;
use crate::sink::DiskSink;
use crate::source::ByteStream;
use crate::value::CollectedValue;

fn chunks(parts: &[&[u8]]) -> ByteStream {
    let owned: Vec<io::Result<Vec<u8>>> = parts.iter().map(|p| Ok(p.to_vec())).collect();
    stream::iter(owned).boxed()
}

#[tokio::test]
async fn writes_every_chunk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.bin");

    let sink = DiskSink::create("doc", path.clone(), None).await.expect("create");
    assert_eq!(sink.path(), path.as_path());
    let value = sink.consume(chunks(&[b"hello ", b"world"])).await.expect("consume");

    assert_eq!(
        value,
        CollectedValue::DiskFile {
            path: path.clone(),
            size: 11
        }
    );
    let written = tokio::fs::read(&path).await.expect("read back");
    assert_eq!(written, b"hello world");
}

#[tokio::test]
async fn exactly_max_size_is_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("exact.bin");

    let sink = DiskSink::create("doc", path.clone(), Some(SizeLimit::new(4)))
        .await
        .expect("create");
    let value = sink.consume(chunks(&[b"ab", b"cd"])).await.expect("at limit");
    assert_eq!(value.size(), Some(4));
    assert!(path.exists());
}

#[tokio::test]
async fn one_byte_over_fails_and_removes_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("over.bin");

    let sink = DiskSink::create(
        "doc",
        path.clone(),
        Some(SizeLimit::new(4).with_message("Upload too large")),
    )
    .await
    .expect("create");
    let err = sink
        .consume(chunks(&[b"ab", b"cde"]))
        .await
        .expect_err("over limit");

    assert_eq!(err.kind(), ErrorKind::SizeLimitExceeded);
    assert_eq!(err.to_string(), "doc: Upload too large");
    assert!(!path.exists());
}

#[tokio::test]
async fn stream_error_removes_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.bin");

    let broken: ByteStream = stream::iter(vec![
        Ok(b"partial".to_vec()),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
    ])
    .boxed();
    let sink = DiskSink::create("doc", path.clone(), None).await.expect("create");
    let err = sink.consume(broken).await.expect_err("stream error");

    assert_eq!(err.kind(), ErrorKind::SinkIo);
    assert_eq!(err.key(), Some("doc"));
    assert!(!path.exists());
}

#[tokio::test]
async fn create_in_missing_directory_is_a_sink_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("no-such-dir").join("file.bin");

    let err = DiskSink::create("doc", path, None).await.expect_err("no parent");
    assert_eq!(err.kind(), ErrorKind::SinkIo);
}
