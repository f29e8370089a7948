//! # Streams
//!
//! [`Stream`] is the queue primitive behind every edge of a graph: a named FIFO
//! of pending [`Packet`]s, the timestamp of the last accepted packet, an
//! optional capacity and a closed flag.
//!
//! Invariants enforced by [`Stream::push`]:
//!
//! - timestamps of accepted packets are strictly increasing
//! - nothing is accepted after [`Stream::close`]
//! - a bounded stream never holds more than its capacity
//!
//! `Stream` itself does no locking. The scheduler wraps each one in a mutex and
//! only holds the lock for a single push, pop or peek.

use crate::error::GraphError;
use crate::packet::Packet;
use crate::time::Timestamp;
use std::collections::VecDeque;

/// A single-producer FIFO of timestamped packets.
#[derive(Debug)]
pub struct Stream {
  name: String,
  capacity: Option<usize>,
  queue: VecDeque<Packet>,
  last_timestamp: Option<Timestamp>,
  closed: bool,
}

impl Stream {
  /// Creates an unbounded, open stream.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      capacity: None,
      queue: VecDeque::new(),
      last_timestamp: None,
      closed: false,
    }
  }

  /// Creates an open stream holding at most `capacity` pending packets.
  ///
  /// A capacity of zero is treated as one.
  pub fn bounded(name: impl Into<String>, capacity: usize) -> Self {
    let mut stream = Self::new(name);
    stream.capacity = Some(capacity.max(1));
    stream
  }

  /// Returns the stream's name.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Appends a packet.
  ///
  /// # Errors
  ///
  /// - [`GraphError::StreamClosed`] if the stream was closed
  /// - [`GraphError::OrderingViolation`] if the packet's timestamp is not after
  ///   the last accepted one
  /// - [`GraphError::StreamFull`] if the stream is bounded and at capacity
  ///   (retryable, nothing was consumed)
  pub fn push(&mut self, packet: Packet) -> Result<(), GraphError> {
    self.check_push(&packet)?;
    if self.is_full() {
      return Err(GraphError::StreamFull {
        stream: self.name.clone(),
      });
    }
    self.last_timestamp = Some(packet.timestamp());
    self.queue.push_back(packet);
    Ok(())
  }

  /// Validates closure and ordering for `packet` without touching capacity.
  pub fn check_push(&self, packet: &Packet) -> Result<(), GraphError> {
    if self.closed {
      return Err(GraphError::StreamClosed {
        stream: self.name.clone(),
      });
    }
    if let Some(last) = self.last_timestamp
      && packet.timestamp() <= last
    {
      return Err(GraphError::OrderingViolation {
        stream: self.name.clone(),
        last,
        timestamp: packet.timestamp(),
      });
    }
    Ok(())
  }

  /// Removes and returns the oldest pending packet.
  pub fn pop(&mut self) -> Option<Packet> {
    self.queue.pop_front()
  }

  /// Returns the oldest pending packet without removing it.
  pub fn peek(&self) -> Option<&Packet> {
    self.queue.front()
  }

  /// Timestamp of the oldest pending packet.
  pub fn head_timestamp(&self) -> Option<Timestamp> {
    self.queue.front().map(Packet::timestamp)
  }

  /// Marks the stream closed. Pending packets stay available to `pop`.
  pub fn close(&mut self) {
    self.closed = true;
  }

  /// Drops every pending packet.
  pub fn clear(&mut self) {
    self.queue.clear();
  }

  /// Returns `true` once [`Stream::close`] has been called.
  pub fn is_closed(&self) -> bool {
    self.closed
  }

  /// Returns `true` if the stream is closed and has nothing left to pop.
  pub fn is_drained(&self) -> bool {
    self.closed && self.queue.is_empty()
  }

  /// Returns `true` if a bounded stream is at capacity.
  pub fn is_full(&self) -> bool {
    self
      .capacity
      .is_some_and(|capacity| self.queue.len() >= capacity)
  }

  /// Number of pending packets.
  pub fn len(&self) -> usize {
    self.queue.len()
  }

  /// Returns `true` if no packets are pending.
  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }

  /// Capacity of a bounded stream.
  pub fn capacity(&self) -> Option<usize> {
    self.capacity
  }

  /// Timestamp of the last accepted packet.
  pub fn last_timestamp(&self) -> Option<Timestamp> {
    self.last_timestamp
  }
}
