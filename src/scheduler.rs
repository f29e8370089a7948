//! # Scheduler
//!
//! Drives node instances during a run. Every node gets its own tokio task
//! (`run_node`); tasks for different nodes run concurrently, while the calls
//! on one node are strictly sequential because the task owns it.
//!
//! ## Input Synchronization
//!
//! `InputSet::poll` decides when a node with inputs is ready:
//!
//! - **Required inputs**: the node runs at timestamp `T` only once every
//!   required input has a packet at `T`. When the heads disagree, packets older
//!   than the newest head can never be matched (timestamps only grow) and are
//!   discarded. Optional inputs contribute their packet at `T` if one is
//!   already queued; older optional packets are discarded.
//! - **Only optional inputs**: the node runs once every input either has a
//!   packet or is closed, at the smallest queued timestamp, with the packets at
//!   exactly that timestamp.
//! - **Finished**: a required input is closed and empty (no further common
//!   timestamp exists), or every input of an all-optional node is.
//!
//! Source nodes have no inputs and are invoked repeatedly until they return
//! [`ProcessStatus::Stop`] or the graph stops its sources.
//!
//! ## Failure
//!
//! The first error recorded in `RunContext::fail` wins. Failing closes and
//! clears every queue and closes every writer, which wakes blocked consumers,
//! producers and pollers so every task can exit. A panicking node is caught by
//! its own task and fails the run as [`GraphError::NodeProcess`].

use crate::channels::{ConsumerQueue, QueueHead, StreamWriter};
use crate::error::GraphError;
use crate::node::{Node, NodeContext, ProcessStatus};
use crate::packet::Packet;
use crate::time::Timestamp;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::{debug, error, trace, warn};

/// State shared by every task of one run.
pub(crate) struct RunContext {
  error: Mutex<Option<GraphError>>,
  failed: AtomicBool,
  sources_stopped: AtomicBool,
  writers: Vec<Arc<StreamWriter>>,
  graph_inputs: Vec<Arc<StreamWriter>>,
}

impl RunContext {
  pub(crate) fn new(writers: Vec<Arc<StreamWriter>>, graph_inputs: Vec<Arc<StreamWriter>>) -> Self {
    Self {
      error: Mutex::new(None),
      failed: AtomicBool::new(false),
      sources_stopped: AtomicBool::new(false),
      writers,
      graph_inputs,
    }
  }

  pub(crate) fn is_failed(&self) -> bool {
    self.failed.load(Ordering::Acquire)
  }

  pub(crate) fn sources_stopped(&self) -> bool {
    self.sources_stopped.load(Ordering::Acquire)
  }

  /// Records `err` as the run's error (if none yet) and tears the run down.
  pub(crate) fn fail(&self, err: GraphError) {
    {
      let mut slot = crate::channels::lock(&self.error);
      if slot.is_some() {
        trace!(error = %err, "ignoring error after failure");
        return;
      }
      error!(error = %err, "graph run failed");
      *slot = Some(err);
    }
    self.failed.store(true, Ordering::Release);
    self.sources_stopped.store(true, Ordering::Release);
    for writer in &self.writers {
      writer.close();
      for queue in writer.consumers() {
        queue.abort();
      }
    }
  }

  /// Closes every graph input stream and stops every source node.
  pub(crate) fn stop_sources(&self) {
    debug!("closing all packet sources");
    self.sources_stopped.store(true, Ordering::Release);
    for writer in &self.graph_inputs {
      writer.close();
    }
  }

  pub(crate) fn take_error(&self) -> Option<GraphError> {
    crate::channels::lock(&self.error).take()
  }
}

/// One declared input port of a node during a run.
pub(crate) struct InputPort {
  /// `None` for an unconnected optional port.
  pub(crate) queue: Option<Arc<ConsumerQueue>>,
  pub(crate) optional: bool,
}

/// Outcome of [`InputSet::poll`].
#[derive(Debug)]
pub(crate) enum Readiness {
  /// Invoke the node at this timestamp with these packets (one per port).
  Ready(Timestamp, Vec<Option<Packet>>),
  /// Wait for more input.
  Pending,
  /// No further invocation is possible.
  Finished,
}

/// The synchronized input side of one node.
pub(crate) struct InputSet {
  node: String,
  ports: Vec<InputPort>,
}

impl InputSet {
  pub(crate) fn new(node: impl Into<String>, ports: Vec<InputPort>) -> Self {
    Self {
      node: node.into(),
      ports,
    }
  }

  fn head(&self, index: usize) -> QueueHead {
    match &self.ports[index].queue {
      Some(queue) => queue.head(),
      None => QueueHead::Drained,
    }
  }

  fn pop(&self, index: usize) -> Option<Packet> {
    self.ports[index].queue.as_ref().and_then(|queue| queue.pop())
  }

  /// Pops packets older than `timestamp` from port `index`.
  fn discard_before(&self, index: usize, timestamp: Timestamp) {
    while let QueueHead::At(head) = self.head(index) {
      if head >= timestamp {
        break;
      }
      if let Some(packet) = self.pop(index) {
        warn!(
          node = %self.node,
          port = index,
          timestamp = %packet.timestamp(),
          "discarding packet with no matching timestamp on other inputs"
        );
      }
    }
  }

  /// Decides whether the node can run now.
  pub(crate) fn poll(&self) -> Readiness {
    let required: Vec<usize> = (0..self.ports.len())
      .filter(|&i| !self.ports[i].optional)
      .collect();
    if required.is_empty() {
      self.poll_optional()
    } else {
      self.poll_required(&required)
    }
  }

  fn poll_required(&self, required: &[usize]) -> Readiness {
    loop {
      let mut oldest = Timestamp::MAX;
      let mut newest = Timestamp::MIN;
      for &index in required {
        match self.head(index) {
          QueueHead::Drained => return Readiness::Finished,
          QueueHead::Empty => return Readiness::Pending,
          QueueHead::At(timestamp) => {
            oldest = oldest.min(timestamp);
            newest = newest.max(timestamp);
          }
        }
      }
      if oldest < newest {
        for &index in required {
          self.discard_before(index, newest);
        }
        continue;
      }

      let timestamp = oldest;
      let packets = (0..self.ports.len())
        .map(|index| {
          if !self.ports[index].optional {
            return self.pop(index);
          }
          self.discard_before(index, timestamp);
          match self.head(index) {
            QueueHead::At(head) if head == timestamp => self.pop(index),
            _ => None,
          }
        })
        .collect();
      return Readiness::Ready(timestamp, packets);
    }
  }

  fn poll_optional(&self) -> Readiness {
    let mut oldest: Option<Timestamp> = None;
    for index in 0..self.ports.len() {
      match self.head(index) {
        QueueHead::Empty => return Readiness::Pending,
        QueueHead::Drained => {}
        QueueHead::At(timestamp) => {
          oldest = Some(oldest.map_or(timestamp, |t| t.min(timestamp)));
        }
      }
    }
    let Some(timestamp) = oldest else {
      return Readiness::Finished;
    };
    let packets = (0..self.ports.len())
      .map(|index| match self.head(index) {
        QueueHead::At(head) if head == timestamp => self.pop(index),
        _ => None,
      })
      .collect();
    Readiness::Ready(timestamp, packets)
  }

  /// Stops accepting input: pending and future packets are dropped.
  pub(crate) fn detach(&self) {
    for port in &self.ports {
      if let Some(queue) = &port.queue {
        queue.detach();
      }
    }
  }
}

/// Everything a node task owns.
pub(crate) struct NodeWorker {
  pub(crate) name: String,
  pub(crate) node: Box<dyn Node>,
  pub(crate) context: NodeContext,
  pub(crate) inputs: InputSet,
  /// Wakes the task when any input queue changes.
  pub(crate) readable: Arc<Notify>,
  /// Writers indexed like the contract's outputs.
  pub(crate) outputs: Vec<Arc<StreamWriter>>,
  pub(crate) is_source: bool,
  pub(crate) run: Arc<RunContext>,
}

impl NodeWorker {
  /// Delivers everything the node emitted during its last call.
  async fn flush(&mut self) -> Result<(), GraphError> {
    for (index, packet) in self.context.take_emitted() {
      self.outputs[index].write(packet).await?;
    }
    Ok(())
  }

  fn node_error(&self, source: crate::node::NodeExecutionError) -> GraphError {
    GraphError::NodeProcess {
      node: self.name.clone(),
      source,
    }
  }

  /// Runs one `process` call, returning `None` when the node should not be
  /// invoked again.
  async fn step(&mut self) -> Result<Option<ProcessStatus>, GraphError> {
    if self.is_source {
      if self.run.sources_stopped() {
        return Ok(None);
      }
      self.context.clear_inputs();
      self.context.begin(Timestamp::MIN, Vec::new());
    } else {
      loop {
        if self.run.is_failed() {
          return Ok(None);
        }
        match self.inputs.poll() {
          Readiness::Ready(timestamp, packets) => {
            trace!(node = %self.name, timestamp = %timestamp, "process");
            self.context.begin(timestamp, packets);
            break;
          }
          Readiness::Pending => self.readable.notified().await,
          Readiness::Finished => return Ok(None),
        }
      }
    }

    let result = self.node.process(&mut self.context).await;
    // Emitted packets stay visible even when the call itself failed.
    self.flush().await?;
    result.map(Some).map_err(|source| self.node_error(source))
  }

  async fn open(&mut self) -> Result<(), GraphError> {
    self.context.clear_inputs();
    let result = self.node.open(&mut self.context).await;
    self.flush().await?;
    result.map_err(|source| self.node_error(source))
  }

  async fn close(&mut self) -> Result<(), GraphError> {
    self.context.clear_inputs();
    let result = self.node.close(&mut self.context).await;
    self.flush().await?;
    result.map_err(|source| self.node_error(source))
  }

  async fn drive(&mut self) -> Result<(), GraphError> {
    self.open().await?;
    loop {
      if self.run.is_failed() {
        return Ok(());
      }
      match self.step().await? {
        Some(ProcessStatus::Continue) => {
          if self.is_source {
            tokio::task::yield_now().await;
          }
        }
        Some(ProcessStatus::Stop) => {
          debug!(node = %self.name, "node requested stop");
          if !self.is_source {
            self.run.stop_sources();
          }
          break;
        }
        None => break,
      }
    }
    self.inputs.detach();
    if self.run.is_failed() {
      return Ok(());
    }
    self.close().await
  }
}

/// Text of a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "node panicked".to_string()
  }
}

/// Task body for one node.
///
/// A panic inside the node is caught here and fails the run like an error,
/// so tasks blocked on this node's queues are released.
pub(crate) async fn run_node(mut worker: NodeWorker) {
  debug!(node = %worker.name, "node started");
  let outcome = AssertUnwindSafe(worker.drive()).catch_unwind().await;
  let result = outcome.unwrap_or_else(|payload| {
    Err(GraphError::NodeProcess {
      node: worker.name.clone(),
      source: format!("panicked: {}", panic_message(payload.as_ref())).into(),
    })
  });
  if let Err(err) = result {
    worker.inputs.detach();
    worker.run.fail(err);
  }
  for output in &worker.outputs {
    output.close();
  }
  debug!(node = %worker.name, "node finished");
}
