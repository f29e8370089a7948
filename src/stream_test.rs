//! # Stream Test Suite
//!
//! Covers ordering, closure and capacity rules of [`Stream`], with a property
//! test for timestamp ordering over arbitrary push sequences.

use crate::error::GraphError;
use crate::packet::Packet;
use crate::stream::Stream;
use crate::time::Timestamp;
use proptest::prelude::*;

fn packet(t: i64) -> Packet {
  Packet::new(t, Timestamp::new(t))
}

#[test]
fn test_push_pop_fifo() {
  let mut stream = Stream::new("s");
  stream.push(packet(1)).unwrap();
  stream.push(packet(3)).unwrap();
  assert_eq!(stream.len(), 2);
  assert_eq!(stream.head_timestamp(), Some(Timestamp::new(1)));
  assert_eq!(stream.peek().map(Packet::timestamp), Some(Timestamp::new(1)));
  assert_eq!(stream.pop().unwrap().timestamp(), Timestamp::new(1));
  assert_eq!(stream.pop().unwrap().timestamp(), Timestamp::new(3));
  assert!(stream.pop().is_none());
  assert!(stream.is_empty());
  assert_eq!(stream.last_timestamp(), Some(Timestamp::new(3)));
}

#[test]
fn test_non_increasing_timestamp_is_rejected() {
  let mut stream = Stream::new("s");
  stream.push(packet(5)).unwrap();
  let err = stream.push(packet(5)).unwrap_err();
  assert!(matches!(
    err,
    GraphError::OrderingViolation { last, timestamp, .. }
      if last == Timestamp::new(5) && timestamp == Timestamp::new(5)
  ));
  assert!(stream.push(packet(4)).is_err());
  assert_eq!(stream.len(), 1);
}

#[test]
fn test_ordering_holds_after_pop() {
  let mut stream = Stream::new("s");
  stream.push(packet(2)).unwrap();
  stream.pop();
  assert!(matches!(
    stream.push(packet(1)),
    Err(GraphError::OrderingViolation { .. })
  ));
}

#[test]
fn test_closed_stream_rejects_push_but_drains() {
  let mut stream = Stream::new("s");
  stream.push(packet(0)).unwrap();
  stream.close();
  assert!(stream.is_closed());
  assert!(!stream.is_drained());
  assert!(matches!(
    stream.push(packet(1)),
    Err(GraphError::StreamClosed { .. })
  ));
  assert!(stream.pop().is_some());
  assert!(stream.is_drained());
}

#[test]
fn test_bounded_stream_is_retryable_when_full() {
  let mut stream = Stream::bounded("s", 2);
  assert_eq!(stream.capacity(), Some(2));
  stream.push(packet(0)).unwrap();
  stream.push(packet(1)).unwrap();
  assert!(stream.is_full());

  let err = stream.push(packet(2)).unwrap_err();
  assert!(err.is_retryable());
  // The rejected timestamp was not recorded.
  stream.pop();
  stream.push(packet(2)).unwrap();
}

#[test]
fn test_zero_capacity_means_one() {
  let stream = Stream::bounded("s", 0);
  assert_eq!(stream.capacity(), Some(1));
}

#[test]
fn test_clear_keeps_ordering_state() {
  let mut stream = Stream::new("s");
  stream.push(packet(3)).unwrap();
  stream.clear();
  assert!(stream.is_empty());
  assert!(stream.push(packet(3)).is_err());
}

proptest! {
  #[test]
  fn test_accepted_packets_are_strictly_increasing(timestamps in prop::collection::vec(-50i64..50, 0..40)) {
    let mut stream = Stream::new("prop");
    let mut last: Option<i64> = None;
    for t in &timestamps {
      let accepted = stream.push(packet(*t)).is_ok();
      let expected = last.is_none_or(|previous| *t > previous);
      prop_assert_eq!(accepted, expected);
      if accepted {
        last = Some(*t);
      }
    }
    let mut previous = None;
    while let Some(p) = stream.pop() {
      if let Some(prev) = previous {
        prop_assert!(p.timestamp() > prev);
      }
      previous = Some(p.timestamp());
    }
  }
}
