//! # Packet Test Suite
//!
//! Covers construction, typed access, re-stamping and shared ownership of
//! [`Packet`] values.

use crate::packet::{Packet, PacketType};
use crate::time::Timestamp;
use std::sync::Arc;

#[test]
fn test_packet_holds_value_and_timestamp() {
  let packet = Packet::new(String::from("hello"), Timestamp::new(7));
  assert_eq!(packet.timestamp(), Timestamp::new(7));
  assert_eq!(packet.get::<String>().unwrap(), "hello");
  assert!(packet.is::<String>());
  assert!(!packet.is::<&str>());
}

#[test]
fn test_get_wrong_type_reports_both_names() {
  let packet = Packet::new(1.5f64, Timestamp::new(0));
  let err = packet.get::<i32>().unwrap_err();
  assert_eq!(err.expected, "i32");
  assert_eq!(err.actual, "f64");
}

#[test]
fn test_at_shares_the_value() {
  let value = Arc::new(vec![1u8, 2, 3]);
  let packet = Packet::from_arc(Arc::clone(&value), Timestamp::new(1));
  let later = packet.at(Timestamp::new(2));

  assert_eq!(packet.timestamp(), Timestamp::new(1));
  assert_eq!(later.timestamp(), Timestamp::new(2));
  let shared = later.share::<Vec<u8>>().unwrap();
  assert!(Arc::ptr_eq(&shared, &value));
}

#[test]
fn test_clone_does_not_copy_payload() {
  let packet = Packet::new(vec![0u32; 16], Timestamp::new(0));
  let copy = packet.clone();
  let a = packet.share::<Vec<u32>>().unwrap();
  let b = copy.share::<Vec<u32>>().unwrap();
  assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_share_wrong_type() {
  let packet = Packet::new(3i64, Timestamp::new(0));
  assert!(packet.share::<u64>().is_err());
}

#[test]
fn test_packet_type_equality_is_by_type() {
  assert_eq!(PacketType::of::<f64>(), PacketType::of::<f64>());
  assert_ne!(PacketType::of::<f64>(), PacketType::of::<f32>());
  assert_eq!(PacketType::of::<f64>().to_string(), "f64");
  let packet = Packet::new(0.0f64, Timestamp::new(0));
  assert_eq!(packet.packet_type(), PacketType::of::<f64>());
}

#[test]
fn test_debug_shows_type_and_timestamp() {
  let packet = Packet::new(5u8, Timestamp::new(9));
  let debug = format!("{:?}", packet);
  assert!(debug.contains("u8"));
  assert!(debug.contains("9"));
}
