//! Tests for the failure path: one error, files removed, source detached.

use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::ErrorKind;
use crate::form::Form;
use crate::schema::{FieldSpec, Rule, SizeLimit};
use crate::source::{ChannelSource, FilePart, MemorySource, SourceEvent};
use crate::tests::support::{PipeState, RecordingPipe, StallingConsumer, file_count};

fn strict_name() -> FieldSpec {
    FieldSpec::field("name").rule(Rule::try_pattern("^[A-Z]", "Bad capitalization").expect("regex"))
}

#[tokio::test]
async fn failing_field_removes_written_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let form = Form::builder()
        .field(FieldSpec::disk_file("avatar"))
        .field(strict_name())
        .with_temp_dir(dir.path())
        .build()
        .expect("form");

    let source = MemorySource::default()
        .push_file("avatar", FilePart::from_bytes("image bytes"))
        .push_field("name", "lowercase");
    let err = form.parse(source).await.expect_err("bad name");

    assert_eq!(err.key(), Some("name"));
    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test]
async fn missing_required_field_removes_written_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let form = Form::builder()
        .field(FieldSpec::field("title").required())
        .field(FieldSpec::disk_file("docs").multiple())
        .with_temp_dir(dir.path())
        .build()
        .expect("form");

    let source = MemorySource::default()
        .push_file("docs", FilePart::from_bytes("one"))
        .push_file("docs", FilePart::from_bytes("two"));
    let err = form.parse(source).await.expect_err("title missing");

    assert_eq!(err.kind(), ErrorKind::RequiredFieldMissing);
    assert_eq!(err.key(), Some("title"));
    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test]
async fn oversize_file_removes_its_siblings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let form = Form::builder()
        .field(FieldSpec::disk_file("small"))
        .field(FieldSpec::disk_file("large").with_max_size(SizeLimit::new(3)))
        .with_temp_dir(dir.path())
        .build()
        .expect("form");

    let source = MemorySource::default()
        .push_file("small", FilePart::from_bytes("ok"))
        .push_file("large", FilePart::from_bytes("too large"));
    let err = form.parse(source).await.expect_err("large over limit");

    assert_eq!(err.kind(), ErrorKind::SizeLimitExceeded);
    assert_eq!(err.key(), Some("large"));
    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test]
async fn strict_duplicate_file_fails_and_cleans_up() {
    let dir = tempfile::tempdir().expect("tempdir");
    let form = Form::builder()
        .field(FieldSpec::disk_file("avatar").strict())
        .with_temp_dir(dir.path())
        .build()
        .expect("form");

    let source = MemorySource::default()
        .push_file("avatar", FilePart::from_bytes("one"))
        .push_file("avatar", FilePart::from_bytes("two"));
    let err = form.parse(source).await.expect_err("second avatar");

    assert_eq!(err.kind(), ErrorKind::DuplicateNotAllowed);
    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test]
async fn in_flight_upload_is_cancelled_and_removed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let form = Form::builder()
        .field(FieldSpec::disk_file("upload"))
        .field(strict_name())
        .with_temp_dir(dir.path())
        .build()
        .expect("form");

    // The upload never finishes: its sender stays open for the whole parse.
    let (part_tx, part_rx) = futures::channel::mpsc::unbounded::<io::Result<Vec<u8>>>();
    part_tx
        .unbounded_send(Ok(b"partial".to_vec()))
        .expect("send chunk");

    let (handle, source) = ChannelSource::channel();
    handle.file("upload", FilePart::new(part_rx));
    handle.field("name", "lowercase");

    let err = tokio::time::timeout(Duration::from_secs(5), form.parse(source))
        .await
        .expect("parse must not wait for the upload")
        .expect_err("bad name");

    assert_eq!(err.key(), Some("name"));
    assert!(part_tx.is_closed());
    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test]
async fn first_error_wins() {
    let form = Form::builder()
        .field(FieldSpec::field("slow").rule(Rule::check_async(
            |_, _| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                false
            },
            "slow failure",
        )))
        .field(FieldSpec::field("fast").rule(Rule::check(|_, _| false, "fast failure")))
        .build()
        .expect("form");

    let err = form
        .parse(MemorySource::from_fields([("slow", "x"), ("fast", "y")]))
        .await
        .expect_err("both fail");
    assert_eq!(err.key(), Some("fast"));
    assert_eq!(err.detail(), "fast failure");
}

#[tokio::test]
async fn failure_detaches_the_source() {
    let form = Form::builder()
        .field(strict_name())
        .build()
        .expect("form");

    let mut source = MemorySource::from_fields([("name", "bad"), ("other", "x"), ("more", "y")]);
    let err = form.parse(&mut source).await.expect_err("bad name");

    assert_eq!(err.key(), Some("name"));
    assert!(source.is_detached());
    assert_eq!(source.remaining(), 0);
}

#[tokio::test]
async fn successful_parse_leaves_source_attached() {
    let form = Form::builder()
        .field(strict_name())
        .build()
        .expect("form");

    let mut source = MemorySource::from_fields([("name", "Good")]);
    form.parse(&mut source).await.expect("valid");
    assert!(!source.is_detached());
}

#[tokio::test]
async fn decoder_error_is_unattributed() {
    let form = Form::builder()
        .field(FieldSpec::field("name"))
        .build()
        .expect("form");

    let mut source = MemorySource::from_fields([("name", "Foo")])
        .push(SourceEvent::Error(io::Error::new(
            io::ErrorKind::InvalidData,
            "malformed boundary",
        )));
    let err = form.parse(&mut source).await.expect_err("decoder failed");

    assert_eq!(err.kind(), ErrorKind::Decoder);
    assert_eq!(err.key(), None);
    assert!(err.detail().contains("malformed boundary"));
    assert!(source.is_detached());
}

#[tokio::test]
async fn closed_channel_without_end_is_a_decoder_error() {
    let form = Form::builder()
        .field(FieldSpec::field("name"))
        .build()
        .expect("form");

    let (handle, source) = ChannelSource::channel();
    handle.field("name", "Foo");
    drop(handle);

    let err = form.parse(source).await.expect_err("truncated body");
    assert_eq!(err.kind(), ErrorKind::Decoder);
}

#[tokio::test]
async fn failure_severs_and_resumes_upstream() {
    let form = Form::builder()
        .field(strict_name())
        .build()
        .expect("form");

    let state = Arc::new(PipeState::default());
    state.readable.store(true, Ordering::SeqCst);
    let (handle, source) = ChannelSource::channel();
    let source = source.with_upstream(Box::new(RecordingPipe(Arc::clone(&state))));
    handle.field("name", "bad");

    form.parse(source).await.expect_err("bad name");

    assert!(state.severed.load(Ordering::SeqCst));
    assert!(state.resumed.load(Ordering::SeqCst));
    assert!(handle.is_closed());
}

#[tokio::test]
async fn stream_consumer_over_limit_fails_the_form() {
    let form = Form::builder()
        .field(
            FieldSpec::streamed_file("video", Arc::new(StallingConsumer))
                .with_max_size(SizeLimit::new(8)),
        )
        .build()
        .expect("form");

    let source = MemorySource::default().push_file(
        "video",
        FilePart::from_chunks(vec![b"01234".to_vec(), b"56789".to_vec()]),
    );
    let err = tokio::time::timeout(Duration::from_secs(5), form.parse(source))
        .await
        .expect("size error must not wait for the consumer")
        .expect_err("over limit");

    assert_eq!(err.kind(), ErrorKind::SizeLimitExceeded);
    assert_eq!(err.key(), Some("video"));
}
