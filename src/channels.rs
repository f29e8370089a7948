//! # Stream Channels
//!
//! Shared plumbing between the producer of a stream and its consumers.
//!
//! - [`ConsumerQueue`]: one [`Stream`] per consumer (node input port or
//!   poller), guarded by a mutex that is only held for a single push, pop or
//!   peek and never across an `.await`. Pushes wake the consumer through its
//!   [`Notify`]; pops wake a producer waiting for space.
//! - [`StreamWriter`]: the producer side of a named stream. It validates each
//!   packet once (closure, ordering, declared types), fans it out to every
//!   consumer queue and then runs the stream's observers, synchronously, on the
//!   producing task.
//!
//! Lock order is always writer state, then queue. Queues never take the writer
//! lock.

use crate::contract::PortType;
use crate::error::GraphError;
use crate::node::NodeExecutionError;
use crate::packet::Packet;
use crate::stream::Stream;
use crate::time::Timestamp;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::trace;

/// Callback invoked for every packet on an observed stream.
pub type PacketObserver = Box<dyn FnMut(&Packet) -> Result<(), NodeExecutionError> + Send>;

/// Locks `mutex`, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A consumer's private queue for one stream.
pub(crate) struct ConsumerQueue {
  stream: Mutex<Stream>,
  /// Type the consuming port declared.
  port_type: PortType,
  /// Wakes the consumer. Shared by all queues of one consumer.
  readable: Arc<Notify>,
  /// Wakes the producer when space frees up.
  writable: Notify,
  /// Set when the consumer has finished; further packets are discarded.
  detached: AtomicBool,
}

impl ConsumerQueue {
  pub(crate) fn new(stream: Stream, port_type: PortType, readable: Arc<Notify>) -> Arc<Self> {
    Arc::new(Self {
      stream: Mutex::new(stream),
      port_type,
      readable,
      writable: Notify::new(),
      detached: AtomicBool::new(false),
    })
  }

  pub(crate) fn port_type(&self) -> PortType {
    self.port_type
  }

  fn is_detached(&self) -> bool {
    self.detached.load(Ordering::Acquire)
  }

  pub(crate) fn is_full(&self) -> bool {
    !self.is_detached() && lock(&self.stream).is_full()
  }

  /// Pushes without waiting; `StreamFull` if at capacity.
  pub(crate) fn try_push(&self, packet: Packet) -> Result<(), GraphError> {
    if self.is_detached() {
      return Ok(());
    }
    {
      let mut stream = lock(&self.stream);
      stream.push(packet)?;
    }
    self.readable.notify_one();
    Ok(())
  }

  /// Pushes, waiting for space on a bounded queue.
  pub(crate) async fn push(&self, packet: Packet) -> Result<(), GraphError> {
    loop {
      match self.try_push(packet.clone()) {
        Err(GraphError::StreamFull { stream }) => {
          trace!(stream = %stream, "waiting for space");
          self.writable.notified().await;
        }
        result => return result,
      }
    }
  }

  pub(crate) fn pop(&self) -> Option<Packet> {
    let packet = {
      let mut stream = lock(&self.stream);
      stream.pop()
    };
    if packet.is_some() {
      self.writable.notify_one();
    }
    packet
  }

  /// Head timestamp, or whether the queue is closed when it is empty.
  pub(crate) fn head(&self) -> QueueHead {
    let stream = lock(&self.stream);
    match stream.head_timestamp() {
      Some(timestamp) => QueueHead::At(timestamp),
      None if stream.is_closed() => QueueHead::Drained,
      None => QueueHead::Empty,
    }
  }

  pub(crate) fn len(&self) -> usize {
    lock(&self.stream).len()
  }

  pub(crate) fn close(&self) {
    {
      let mut stream = lock(&self.stream);
      stream.close();
    }
    self.readable.notify_one();
  }

  /// Closes the queue, drops its packets and wakes both ends.
  pub(crate) fn abort(&self) {
    {
      let mut stream = lock(&self.stream);
      stream.close();
      stream.clear();
    }
    self.readable.notify_one();
    self.writable.notify_one();
  }

  /// Marks the consumer as finished: pending and future packets are dropped.
  pub(crate) fn detach(&self) {
    self.detached.store(true, Ordering::Release);
    {
      let mut stream = lock(&self.stream);
      stream.clear();
    }
    self.writable.notify_one();
  }
}

/// Snapshot of a queue's front.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum QueueHead {
  /// Oldest pending packet's timestamp.
  At(Timestamp),
  /// Nothing pending, more may arrive.
  Empty,
  /// Nothing pending, nothing more will arrive.
  Drained,
}

struct WriterState {
  last_timestamp: Option<Timestamp>,
  closed: bool,
  observers: Vec<PacketObserver>,
}

/// Producer side of a named stream.
pub(crate) struct StreamWriter {
  name: String,
  /// Type declared by the producing port (or resolved for graph inputs).
  port_type: PortType,
  consumers: Vec<Arc<ConsumerQueue>>,
  state: Mutex<WriterState>,
}

impl StreamWriter {
  pub(crate) fn new(name: impl Into<String>, port_type: PortType) -> Self {
    Self {
      name: name.into(),
      port_type,
      consumers: Vec::new(),
      state: Mutex::new(WriterState {
        last_timestamp: None,
        closed: false,
        observers: Vec::new(),
      }),
    }
  }

  pub(crate) fn add_consumer(&mut self, queue: Arc<ConsumerQueue>) {
    self.consumers.push(queue);
  }

  pub(crate) fn consumers(&self) -> &[Arc<ConsumerQueue>] {
    &self.consumers
  }

  pub(crate) fn add_observer(&mut self, observer: PacketObserver) {
    lock(&self.state).observers.push(observer);
  }

  fn validate(&self, state: &WriterState, packet: &Packet) -> Result<(), GraphError> {
    if state.closed {
      return Err(GraphError::StreamClosed {
        stream: self.name.clone(),
      });
    }
    let actual = packet.packet_type();
    let declared = std::iter::once(self.port_type).chain(self.consumers.iter().map(|q| q.port_type()));
    for expected in declared {
      if !expected.accepts(&actual) {
        return Err(GraphError::TypeMismatch {
          stream: self.name.clone(),
          expected: expected.name(),
          actual: actual.name(),
        });
      }
    }
    if let Some(last) = state.last_timestamp
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

  fn notify_observers(&self, packet: &Packet) -> Result<(), GraphError> {
    let mut state = lock(&self.state);
    for observer in state.observers.iter_mut() {
      observer(packet).map_err(|source| GraphError::Observer {
        stream: self.name.clone(),
        source,
      })?;
    }
    Ok(())
  }

  /// Delivers `packet`, waiting for space on bounded consumer queues.
  pub(crate) async fn write(&self, packet: Packet) -> Result<(), GraphError> {
    {
      let mut state = lock(&self.state);
      self.validate(&state, &packet)?;
      state.last_timestamp = Some(packet.timestamp());
    }
    trace!(stream = %self.name, timestamp = %packet.timestamp(), "write");
    for queue in &self.consumers {
      queue.push(packet.clone()).await?;
    }
    self.notify_observers(&packet)
  }

  /// Delivers `packet` only if every consumer queue has room.
  ///
  /// Fails with the retryable [`GraphError::StreamFull`] and delivers nothing
  /// otherwise.
  pub(crate) fn try_write(&self, packet: Packet) -> Result<(), GraphError> {
    {
      let mut state = lock(&self.state);
      self.validate(&state, &packet)?;
      if self.consumers.iter().any(|queue| queue.is_full()) {
        return Err(GraphError::StreamFull {
          stream: self.name.clone(),
        });
      }
      state.last_timestamp = Some(packet.timestamp());
      for queue in &self.consumers {
        queue.try_push(packet.clone())?;
      }
    }
    self.notify_observers(&packet)
  }

  /// Closes the stream and every consumer queue. Idempotent.
  pub(crate) fn close(&self) {
    {
      let mut state = lock(&self.state);
      if state.closed {
        return;
      }
      state.closed = true;
    }
    trace!(stream = %self.name, "close");
    for queue in &self.consumers {
      queue.close();
    }
  }

  pub(crate) fn is_closed(&self) -> bool {
    lock(&self.state).closed
  }
}
