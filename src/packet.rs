//! # Packets
//!
//! A [`Packet`] is one immutable, timestamped value travelling along a stream.
//!
//! Values are stored as `Arc<dyn Any + Send + Sync>`, so cloning a packet,
//! fanning it out to several consumers, or re-stamping it with [`Packet::at`]
//! never copies the payload. Consumers only ever get shared (`&T`) access.
//!
//! Every packet carries a [`PacketType`] tag captured at construction. The graph
//! compares this tag with the type a port declared in its
//! [`Contract`](crate::contract::Contract) when the packet is delivered, so a
//! mismatch surfaces as [`GraphError::TypeMismatch`](crate::error::GraphError::TypeMismatch)
//! instead of a failed downcast deep inside a node.

use crate::error::PacketTypeError;
use crate::time::Timestamp;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Runtime type tag for packet values.
#[derive(Clone, Copy, Debug)]
pub struct PacketType {
  id: TypeId,
  name: &'static str,
}

impl PacketType {
  /// Returns the tag for `T`.
  pub fn of<T: Any>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: std::any::type_name::<T>(),
    }
  }

  /// Returns the Rust type name, as reported by `std::any::type_name`.
  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl PartialEq for PacketType {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for PacketType {}

impl fmt::Display for PacketType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

/// An immutable value with a timestamp.
///
/// # Example
///
/// ```rust
/// use packetweave::packet::Packet;
/// use packetweave::time::Timestamp;
///
/// let packet = Packet::new(0.5f64, Timestamp::new(3));
/// assert_eq!(*packet.get::<f64>().unwrap(), 0.5);
/// assert!(packet.get::<String>().is_err());
///
/// let later = packet.at(Timestamp::new(4));
/// assert_eq!(later.timestamp(), Timestamp::new(4));
/// ```
#[derive(Clone)]
pub struct Packet {
  value: Arc<dyn Any + Send + Sync>,
  packet_type: PacketType,
  timestamp: Timestamp,
}

impl Packet {
  /// Creates a packet holding `value` at `timestamp`.
  pub fn new<T: Any + Send + Sync>(value: T, timestamp: Timestamp) -> Self {
    Self {
      value: Arc::new(value),
      packet_type: PacketType::of::<T>(),
      timestamp,
    }
  }

  /// Creates a packet from an already shared value without copying it.
  pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>, timestamp: Timestamp) -> Self {
    Self {
      value,
      packet_type: PacketType::of::<T>(),
      timestamp,
    }
  }

  /// Returns a packet sharing this packet's value at a different timestamp.
  pub fn at(&self, timestamp: Timestamp) -> Self {
    Self {
      value: Arc::clone(&self.value),
      packet_type: self.packet_type,
      timestamp,
    }
  }

  /// Returns the packet's timestamp.
  pub fn timestamp(&self) -> Timestamp {
    self.timestamp
  }

  /// Returns the type tag of the held value.
  pub fn packet_type(&self) -> PacketType {
    self.packet_type
  }

  /// Returns `true` if the packet holds a `T`.
  pub fn is<T: Any>(&self) -> bool {
    self.packet_type == PacketType::of::<T>()
  }

  /// Borrows the held value as `T`.
  ///
  /// # Errors
  ///
  /// Returns [`PacketTypeError`] if the packet holds another type.
  pub fn get<T: Any>(&self) -> Result<&T, PacketTypeError> {
    self
      .value
      .downcast_ref::<T>()
      .ok_or_else(|| PacketTypeError {
        expected: std::any::type_name::<T>(),
        actual: self.packet_type.name(),
      })
  }

  /// Returns the shared value as `Arc<T>`.
  ///
  /// # Errors
  ///
  /// Returns [`PacketTypeError`] if the packet holds another type.
  pub fn share<T: Any + Send + Sync>(&self) -> Result<Arc<T>, PacketTypeError> {
    Arc::clone(&self.value)
      .downcast::<T>()
      .map_err(|_| PacketTypeError {
        expected: std::any::type_name::<T>(),
        actual: self.packet_type.name(),
      })
  }
}

impl fmt::Debug for Packet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Packet")
      .field("type", &self.packet_type.name())
      .field("timestamp", &self.timestamp)
      .finish()
  }
}
