//! Tests for rule chain evaluation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::engine::RuleChain;
use crate::error::ErrorKind;
use crate::schema::{Rule, Verdict};
use crate::value::{CollectedValue, Value};

fn text(s: &str) -> CollectedValue {
    CollectedValue::Scalar(Value::from(s))
}

#[tokio::test]
async fn empty_chain_passes() {
    let chain = RuleChain::new(Vec::new());
    assert!(chain.is_empty());
    chain.evaluate("k", &text("anything")).await.expect("no rules");
}

#[tokio::test]
async fn first_failure_stops_the_chain() {
    let third_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&third_calls);
    let chain = RuleChain::new(vec![
        Rule::check(|_, _| true, "first"),
        Rule::check(|_, _| false, "second"),
        Rule::check(
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            },
            "third",
        ),
    ]);

    let err = chain.evaluate("name", &text("x")).await.expect_err("second fails");
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(err.key(), Some("name"));
    assert_eq!(err.detail(), "second");
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejection_message_overrides_rule_error() {
    let chain = RuleChain::new(vec![Rule::check(
        |_, value: &CollectedValue| {
            if value.as_str() == Some("root") {
                Verdict::Reject("reserved name".into())
            } else {
                Verdict::Pass
            }
        },
        "generic",
    )]);

    let err = chain.evaluate("user", &text("root")).await.expect_err("rejected");
    assert_eq!(err.detail(), "reserved name");
    chain.evaluate("user", &text("alice")).await.expect("accepted");
}

#[tokio::test]
async fn async_rule_suspends_before_later_rules() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let first = Arc::clone(&order);
    let second = Arc::clone(&order);
    let chain = RuleChain::new(vec![
        Rule::check_async(
            move |_, _| {
                let order = Arc::clone(&first);
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    order.lock().expect("lock").push("async");
                    true
                }
            },
            "async",
        ),
        Rule::check(
            move |_, _| {
                second.lock().expect("lock").push("sync");
                true
            },
            "sync",
        ),
    ]);
    assert!(chain.has_async());

    chain.evaluate("k", &text("v")).await.expect("both pass");
    assert_eq!(*order.lock().expect("lock"), ["async", "sync"]);
}

#[tokio::test]
async fn async_rule_failure_uses_rule_error() {
    let chain = RuleChain::new(vec![Rule::check_async(
        |_, _| async { false },
        "Username taken",
    )]);
    let err = chain.evaluate("username", &text("bob")).await.expect_err("taken");
    assert_eq!(err.to_string(), "username: Username taken");
}

#[tokio::test]
async fn pattern_matches_scalars_and_buffered_files() {
    let chain = RuleChain::new(vec![
        Rule::try_pattern("^[A-Z]", "Bad capitalization").expect("regex"),
    ]);
    chain.evaluate("name", &text("Foo")).await.expect("capitalized");
    let err = chain.evaluate("name", &text("foo")).await.expect_err("lowercase");
    assert_eq!(err.detail(), "Bad capitalization");

    let buffered = CollectedValue::BufferedFile {
        data: Value::Bytes(b"Header\n".to_vec()),
        size: 7,
    };
    chain.evaluate("doc", &buffered).await.expect("bytes match");
}

#[tokio::test]
async fn pattern_reads_disk_file_contents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("upload.txt");
    tokio::fs::write(&path, b"%PDF-1.7").await.expect("write");

    let chain = RuleChain::new(vec![Rule::try_pattern("^%PDF", "Not a PDF").expect("regex")]);
    let value = CollectedValue::DiskFile { path, size: 8 };
    chain.evaluate("doc", &value).await.expect("pdf header");

    let png = dir.path().join("upload.png");
    tokio::fs::write(&png, b"\x89PNG").await.expect("write");
    let err = chain
        .evaluate("doc", &CollectedValue::DiskFile { path: png, size: 4 })
        .await
        .expect_err("not a pdf");
    assert_eq!(err.detail(), "Not a PDF");
}

#[tokio::test]
async fn pattern_passes_streamed_files() {
    let chain = RuleChain::new(vec![Rule::try_pattern("^never$", "no").expect("regex")]);
    chain
        .evaluate("stream", &CollectedValue::StreamedFile { size: 10 })
        .await
        .expect("nothing to match");
}

#[tokio::test]
async fn missing_disk_file_is_a_sink_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chain = RuleChain::new(vec![Rule::try_pattern(".", "no").expect("regex")]);
    let value = CollectedValue::DiskFile {
        path: dir.path().join("gone"),
        size: 0,
    };
    let err = chain.evaluate("doc", &value).await.expect_err("unreadable");
    assert_eq!(err.kind(), ErrorKind::SinkIo);
    assert_eq!(err.key(), Some("doc"));
}

#[tokio::test]
async fn binary_signature_matches_raw_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("upload.png");
    let header = [0x89, b'P', b'N', b'G', 0x0d, 0x0a];
    tokio::fs::write(&path, header).await.expect("write");

    let chain = RuleChain::new(vec![Rule::try_pattern(r"^\x89PNG", "Not a PNG").expect("regex")]);
    chain
        .evaluate("image", &CollectedValue::DiskFile { path, size: 6 })
        .await
        .expect("png on disk");

    let buffered = CollectedValue::BufferedFile {
        data: Value::Bytes(header.to_vec()),
        size: 6,
    };
    chain.evaluate("image", &buffered).await.expect("png in memory");
}

#[tokio::test]
async fn text_values_keep_unicode_classes() {
    let chain = RuleChain::new(vec![Rule::try_pattern(r"^\w+$", "Letters only").expect("regex")]);
    chain.evaluate("city", &text("Zürich")).await.expect("unicode word");

    let letters = RuleChain::new(vec![Rule::try_pattern(r"^\p{L}+$", "Letters only").expect("regex")]);
    let buffered = CollectedValue::BufferedFile {
        data: Value::Bytes("Gdańsk".as_bytes().to_vec()),
        size: 7,
    };
    letters.evaluate("city", &buffered).await.expect("falls back to unicode");
}
