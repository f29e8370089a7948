//! Timestamps for packet ordering and cross-stream synchronization.
//!
//! A [`Timestamp`] is not wall-clock time; it can be a frame counter, a sequence
//! number, or microseconds since capture start. The only contract the runtime
//! relies on is the total order: within a single stream, successive packets
//! carry strictly increasing timestamps, and a node taking several inputs is
//! invoked once per timestamp present on all of its required inputs.
//!
//! Stream closure is not a timestamp. A closed stream is a flag on the stream
//! itself, never a packet with a sentinel time.

use std::fmt;

/// Totally ordered packet timestamp.
///
/// Wraps an `i64` so negative values (e.g. pre-roll frames) are allowed.
/// Implements [`Ord`] so it can be compared across streams directly.
#[derive(
  Clone, Copy, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
  /// Smallest representable timestamp.
  pub const MIN: Timestamp = Timestamp(i64::MIN);

  /// Largest representable timestamp.
  pub const MAX: Timestamp = Timestamp(i64::MAX);

  /// Creates a timestamp from a raw value.
  #[inline]
  pub const fn new(value: i64) -> Self {
    Self(value)
  }

  /// Returns the raw `i64` value.
  #[inline]
  pub const fn value(self) -> i64 {
    self.0
  }

  /// Returns the next timestamp, saturating at [`Timestamp::MAX`].
  #[inline]
  pub const fn next(self) -> Self {
    Self(self.0.saturating_add(1))
  }
}

impl From<i64> for Timestamp {
  fn from(value: i64) -> Self {
    Self(value)
  }
}

impl fmt::Display for Timestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cmp::Ordering;

  #[test]
  fn default_is_zero() {
    assert_eq!(Timestamp::default(), Timestamp::new(0));
    assert_eq!(Timestamp::default().value(), 0);
  }

  #[test]
  fn ordering() {
    assert!(Timestamp(-1) < Timestamp(0));
    assert!(Timestamp(1) > Timestamp(0));
    assert_eq!(Timestamp(42).cmp(&Timestamp(42)), Ordering::Equal);
    assert!(Timestamp::MIN < Timestamp(i64::MIN + 1));
  }

  #[test]
  fn next_saturates() {
    assert_eq!(Timestamp(3).next(), Timestamp(4));
    assert_eq!(Timestamp::MAX.next(), Timestamp::MAX);
  }

  #[test]
  fn display_is_raw_value() {
    assert_eq!(Timestamp(1234).to_string(), "1234");
    assert_eq!(Timestamp::from(-7).to_string(), "-7");
  }

  #[test]
  fn serde_is_transparent_number() {
    let json = serde_json::to_string(&Timestamp(9)).unwrap();
    assert_eq!(json, "9");
    let back: Timestamp = serde_json::from_str("9").unwrap();
    assert_eq!(back, Timestamp(9));
  }
}
