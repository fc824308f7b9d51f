//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use lodestore_foundation::{EntityId, Error, ErrorContext, ErrorKind, LinkId, SemanticLimit};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_entity_not_found() {
    let id = EntityId::new(42, 1);
    let err = Error::entity_not_found(id);
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(_)));
    let msg = format!("{err}");
    assert!(msg.contains("42"));
}

#[test]
fn error_unknown_link_type() {
    let err = Error::unknown_link_type(LinkId(3));
    assert!(matches!(err.kind, ErrorKind::UnknownLinkType(LinkId(3))));
}

#[test]
fn error_empty_entity_id() {
    let err = Error::empty_entity_id();
    assert!(matches!(err.kind, ErrorKind::EmptyEntityId));
    assert!(format!("{err}").contains("empty"));
}

#[test]
fn error_snapshot_expired() {
    let err = Error::snapshot_expired(12);
    assert!(matches!(err.kind, ErrorKind::SnapshotExpired { version: 12 }));
    assert!(err.is_expired());
    assert!(format!("{err}").contains("12"));
}

#[test]
fn error_limit_exceeded() {
    let err = Error::limit_exceeded(SemanticLimit::MaxMaterializedSet { limit: 64 });
    assert!(matches!(err.kind, ErrorKind::LimitExceeded(_)));
    assert!(!err.is_expired());
    assert!(format!("{err}").contains("64"));
}

#[test]
fn error_malformed_handle() {
    let err = Error::malformed_handle("5-0-", 4, "expected digits");
    match &err.kind {
        ErrorKind::MalformedHandle {
            key,
            position,
            message,
        } => {
            assert_eq!(key, "5-0-");
            assert_eq!(*position, 4);
            assert_eq!(message, "expected digits");
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn error_with_context() {
    let err = Error::internal("boom")
        .with_context(ErrorContext::new().with_source("1-0").with_frame("to_set"));
    let ctx = err.context.as_ref().unwrap();
    assert_eq!(ctx.source.as_deref(), Some("1-0"));
    assert_eq!(ctx.stack, vec!["to_set"]);
}

#[test]
fn error_frames_accumulate() {
    let err = Error::empty_entity_id()
        .with_frame("reading link")
        .with_frame("filtering");
    let ctx = err.context.unwrap();
    assert_eq!(ctx.stack, vec!["reading link", "filtering"]);
    assert!(ctx.source.is_none());
}

#[test]
fn error_is_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&Error::internal("x"));
}
