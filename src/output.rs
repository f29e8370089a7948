//! # Output Delivery
//!
//! Two ways for the caller to receive packets from a running graph:
//!
//! - **Observers** ([`PacketObserver`]): callbacks registered with
//!   [`Graph::observe_output_stream`](crate::graph::Graph::observe_output_stream).
//!   They run synchronously on the task that produced the packet, in timestamp
//!   order. An observer error fails the run.
//! - **Pollers** ([`OutputStreamPoller`]): a private FIFO the caller pulls from.
//!   [`OutputStreamPoller::next`] waits until a packet arrives or the stream
//!   closes.
//!
//! Both must be attached after `initialize` and before `start_run`.
//!
//! ```rust,no_run
//! # use packetweave::graph::Graph;
//! # async fn demo(graph: &mut Graph) -> Result<(), packetweave::error::GraphError> {
//! use futures::StreamExt;
//!
//! let poller = graph.add_output_stream_poller("out")?;
//! let mut packets = Box::pin(poller.into_stream());
//! while let Some(packet) = packets.next().await {
//!   println!("{}", packet.timestamp());
//! }
//! # Ok(())
//! # }
//! ```

pub use crate::channels::PacketObserver;

use crate::channels::{ConsumerQueue, QueueHead};
use crate::packet::Packet;
use futures::Stream;
use std::sync::Arc;
use tokio::sync::Notify;

/// Pull-based reader of one graph stream.
pub struct OutputStreamPoller {
  name: String,
  queue: Arc<ConsumerQueue>,
  readable: Arc<Notify>,
}

impl OutputStreamPoller {
  pub(crate) fn new(name: impl Into<String>, queue: Arc<ConsumerQueue>, readable: Arc<Notify>) -> Self {
    Self {
      name: name.into(),
      queue,
      readable,
    }
  }

  /// Name of the polled stream.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Waits for the next packet.
  ///
  /// # Returns
  ///
  /// `Some(packet)` in FIFO order, or `None` once the stream is closed and
  /// every delivered packet has been read. After a failed run the poller's
  /// queue is cleared and `None` is returned immediately.
  pub async fn next(&mut self) -> Option<Packet> {
    loop {
      match self.queue.head() {
        QueueHead::At(_) => return self.queue.pop(),
        QueueHead::Drained => return None,
        QueueHead::Empty => self.readable.notified().await,
      }
    }
  }

  /// Returns the next packet if one is already queued.
  pub fn try_next(&mut self) -> Option<Packet> {
    self.queue.pop()
  }

  /// Number of packets waiting to be read.
  pub fn queue_size(&self) -> usize {
    self.queue.len()
  }

  /// Converts the poller into a [`Stream`] of packets that ends when the
  /// graph stream closes.
  pub fn into_stream(mut self) -> impl Stream<Item = Packet> + Send {
    async_stream::stream! {
      while let Some(packet) = self.next().await {
        yield packet;
      }
    }
  }
}

impl std::fmt::Debug for OutputStreamPoller {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OutputStreamPoller")
      .field("name", &self.name)
      .field("queued", &self.queue.len())
      .finish()
  }
}
