//! # Error Handling Test Suite
//!
//! Covers [`GraphError`] classification and display formatting, and
//! [`PacketTypeError`].

use crate::error::{GraphError, PacketTypeError};
use crate::time::Timestamp;
use std::error::Error;

#[test]
fn test_only_stream_full_is_retryable() {
  let full = GraphError::StreamFull {
    stream: "in".to_string(),
  };
  let closed = GraphError::StreamClosed {
    stream: "in".to_string(),
  };
  let ordering = GraphError::OrderingViolation {
    stream: "in".to_string(),
    last: Timestamp::new(2),
    timestamp: Timestamp::new(1),
  };

  assert!(full.is_retryable());
  assert!(!closed.is_retryable());
  assert!(!ordering.is_retryable());
}

#[test]
fn test_build_errors() {
  let build = [
    GraphError::ContractMismatch {
      node: "n".to_string(),
      detail: "d".to_string(),
    },
    GraphError::DanglingStream {
      stream: "s".to_string(),
      consumer: "n".to_string(),
    },
    GraphError::DuplicateStream {
      stream: "s".to_string(),
    },
    GraphError::UnknownCalculator {
      calculator: "Nope".to_string(),
    },
    GraphError::Cycle {
      nodes: vec!["a".to_string(), "b".to_string()],
    },
    GraphError::InvalidConfig("bad".to_string()),
  ];
  for err in &build {
    assert!(err.is_build_error(), "{err} should be a build error");
  }

  let runtime = GraphError::NodeProcess {
    node: "n".to_string(),
    source: "boom".into(),
  };
  assert!(!runtime.is_build_error());
  assert!(
    !GraphError::StreamClosed {
      stream: "s".to_string()
    }
    .is_build_error()
  );
}

#[test]
fn test_ordering_violation_display() {
  let err = GraphError::OrderingViolation {
    stream: "video".to_string(),
    last: Timestamp::new(5),
    timestamp: Timestamp::new(5),
  };
  assert_eq!(
    err.to_string(),
    "stream 'video': timestamp 5 is not after previous timestamp 5"
  );
}

#[test]
fn test_node_process_keeps_source_verbatim() {
  let err = GraphError::NodeProcess {
    node: "double".to_string(),
    source: "division by zero".into(),
  };
  assert!(err.to_string().contains("double"));
  let source = err.source().expect("source is kept");
  assert_eq!(source.to_string(), "division by zero");
}

#[test]
fn test_packet_type_error() {
  let err = PacketTypeError {
    expected: "f64",
    actual: "i32",
  };
  assert_eq!(err.to_string(), "packet holds i32, not f64");
  assert_eq!(err.clone(), err);
}
