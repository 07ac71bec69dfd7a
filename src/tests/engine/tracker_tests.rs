//! Tests for completion tracking and the required-field check.

use crate::engine::{CompletionTracker, FieldCollector, finalize};
use crate::error::ErrorKind;
use crate::schema::{FieldSpec, Schema};
use crate::value::{CollectedValue, Value};

#[test]
fn done_after_end_when_nothing_pending() {
    let mut tracker = CompletionTracker::new();
    assert!(tracker.finish_decoder());
    assert!(tracker.is_done());
}

#[test]
fn done_waits_for_pending_units() {
    let mut tracker = CompletionTracker::new();
    tracker.begin();
    tracker.begin();
    assert!(!tracker.finish_decoder());
    assert!(!tracker.complete());
    assert_eq!(tracker.pending(), 1);
    assert!(tracker.complete());
}

#[test]
fn unit_settling_before_end_does_not_finish() {
    let mut tracker = CompletionTracker::new();
    tracker.begin();
    assert!(!tracker.complete());
    assert!(!tracker.is_done());
    assert!(tracker.finish_decoder());
}

#[test]
fn done_fires_once() {
    let mut tracker = CompletionTracker::new();
    assert!(tracker.finish_decoder());
    assert!(!tracker.finish_decoder());
    assert!(!tracker.complete());
}

#[test]
fn errored_session_never_completes() {
    let mut tracker = CompletionTracker::new();
    tracker.begin();
    assert!(tracker.mark_errored());
    assert!(!tracker.mark_errored());
    assert!(!tracker.complete());
    assert!(!tracker.finish_decoder());
    assert!(tracker.is_errored());
    assert!(!tracker.is_done());
}

#[test]
fn finalize_reports_first_missing_in_declaration_order() {
    let schema = Schema::new(vec![
        FieldSpec::field("a"),
        FieldSpec::field("b").required(),
        FieldSpec::field("c").required(),
    ])
    .expect("schema");
    let collector = FieldCollector::new();

    let err = finalize(&schema, &collector).expect_err("b and c missing");
    assert_eq!(err.kind(), ErrorKind::RequiredFieldMissing);
    assert_eq!(err.key(), Some("b"));
    assert_eq!(err.detail(), "Field is required");
}

#[test]
fn finalize_passes_when_required_fields_arrived() {
    let schema = Schema::new(vec![FieldSpec::field("a").required()]).expect("schema");
    let mut collector = FieldCollector::new();
    collector
        .merge(
            schema.get("a").expect("a"),
            0,
            CollectedValue::Scalar(Value::from("x")),
        )
        .expect("merge");

    finalize(&schema, &collector).expect("a present");
}
