//! # Nodes
//!
//! A node (calculator) is a unit of computation with a declared
//! [`Contract`] and private mutable state. The graph creates one instance per
//! node entry in the config, moves it onto its own task when the run starts and
//! drives it through three phases:
//!
//! 1. [`Node::open`] once, before any input is delivered
//! 2. [`Node::process`] once per synchronized input timestamp (or, for a source
//!    node with no inputs, repeatedly until it returns [`ProcessStatus::Stop`])
//! 3. [`Node::close`] once, after the inputs are exhausted or the node stopped
//!
//! Calls on one instance never overlap, so nodes need no internal locking.
//!
//! ## Node Kinds
//!
//! - **Source**: no inputs, 1+ outputs (generates packets until it stops)
//! - **Transform**: 1+ inputs, 1+ outputs
//! - **Sink**: 1+ inputs, no outputs
//!
//! ## Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use packetweave::contract::Contract;
//! use packetweave::node::{Node, NodeContext, NodeExecutionError, ProcessStatus};
//! use packetweave::packet::Packet;
//!
//! /// Doubles every f64.
//! struct DoubleNode;
//!
//! #[async_trait]
//! impl Node for DoubleNode {
//!   fn contract(&self) -> Contract {
//!     Contract::new().input::<f64>(0).output::<f64>(0)
//!   }
//!
//!   async fn process(&mut self, cx: &mut NodeContext) -> Result<ProcessStatus, NodeExecutionError> {
//!     let x = *cx.input(0).ok_or("missing input")?.get::<f64>()?;
//!     cx.emit(0, Packet::new(x * 2.0, cx.input_timestamp()))?;
//!     Ok(ProcessStatus::Continue)
//!   }
//! }
//! ```

use crate::contract::{Contract, PortId};
use crate::packet::Packet;
use crate::time::Timestamp;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Error type for node execution operations.
pub type NodeExecutionError = Box<dyn std::error::Error + Send + Sync>;

/// What a node wants to happen after a `process` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
  /// Keep invoking the node as inputs arrive (or, for sources, again).
  Continue,
  /// The node is finished. Its outputs are closed after `close` runs.
  ///
  /// From a source node this simply ends the source. From any other node it
  /// also asks the graph to close its input streams and stop its sources, so
  /// the run winds down without an error.
  Stop,
}

/// The node trait implemented by every calculator.
#[async_trait]
pub trait Node: Send + Sync {
  /// Declares the node's ports. Called once, at graph initialization.
  fn contract(&self) -> Contract;

  /// Called once when the run starts, before any input is delivered.
  ///
  /// The context has no inputs; its timestamp is [`Timestamp::MIN`]. Packets
  /// emitted here are delivered like any other output.
  async fn open(&mut self, _cx: &mut NodeContext) -> Result<(), NodeExecutionError> {
    Ok(())
  }

  /// Processes one input timestamp.
  ///
  /// For nodes with inputs, `cx` holds one packet per required input, all at
  /// [`NodeContext::input_timestamp`], plus any optional input that already
  /// had a packet queued at that timestamp. Source nodes are invoked with an
  /// empty context.
  ///
  /// Optional inputs are never waited for. When a node also has required
  /// inputs and the optional stream's producer runs on another task, an
  /// optional packet at `T` that arrives after the node was invoked at `T` is
  /// dropped as stale, so on a multi-threaded runtime whether it is seen
  /// depends on task scheduling. Nodes that need every packet of a stream at
  /// its timestamp should declare that input as required.
  async fn process(&mut self, cx: &mut NodeContext) -> Result<ProcessStatus, NodeExecutionError>;

  /// Called once after the node's last `process` call.
  async fn close(&mut self, _cx: &mut NodeContext) -> Result<(), NodeExecutionError> {
    Ok(())
  }
}

/// Per-invocation view a node gets of its inputs, outputs and side packets.
pub struct NodeContext {
  node_name: String,
  input_timestamp: Timestamp,
  inputs: Vec<(PortId, Option<Packet>)>,
  output_ids: Vec<PortId>,
  emitted: Vec<(usize, Packet)>,
  side_packets: Arc<HashMap<String, Packet>>,
}

impl NodeContext {
  /// Creates a context for a node with the given declared ports.
  pub fn new(
    node_name: impl Into<String>,
    input_ids: Vec<PortId>,
    output_ids: Vec<PortId>,
    side_packets: Arc<HashMap<String, Packet>>,
  ) -> Self {
    Self {
      node_name: node_name.into(),
      input_timestamp: Timestamp::MIN,
      inputs: input_ids.into_iter().map(|id| (id, None)).collect(),
      output_ids,
      emitted: Vec::new(),
      side_packets,
    }
  }

  /// Name of the node being invoked.
  pub fn node_name(&self) -> &str {
    &self.node_name
  }

  /// Timestamp of the current invocation.
  pub fn input_timestamp(&self) -> Timestamp {
    self.input_timestamp
  }

  /// The packet on input `port` for this invocation, if any.
  pub fn input(&self, port: impl Into<PortId>) -> Option<&Packet> {
    let port = port.into();
    self
      .inputs
      .iter()
      .find(|(id, _)| *id == port)
      .and_then(|(_, packet)| packet.as_ref())
  }

  /// Returns `true` if input `port` has a packet for this invocation.
  pub fn has_input(&self, port: impl Into<PortId>) -> bool {
    self.input(port).is_some()
  }

  /// Number of declared input ports.
  pub fn num_inputs(&self) -> usize {
    self.inputs.len()
  }

  /// Number of declared output ports.
  pub fn num_outputs(&self) -> usize {
    self.output_ids.len()
  }

  /// Queues `packet` on output `port`.
  ///
  /// Packets are delivered after the current call returns, in emission order.
  /// Type and ordering are checked at delivery.
  ///
  /// # Errors
  ///
  /// Returns an error if the node's contract declares no such output.
  pub fn emit(&mut self, port: impl Into<PortId>, packet: Packet) -> Result<(), NodeExecutionError> {
    let port = port.into();
    let index = self
      .output_ids
      .iter()
      .position(|id| *id == port)
      .ok_or_else(|| format!("node '{}' has no output port {}", self.node_name, port))?;
    self.emitted.push((index, packet));
    Ok(())
  }

  /// The input side packet wired to `tag`, if one was supplied.
  pub fn side_packet(&self, tag: &str) -> Option<&Packet> {
    self.side_packets.get(tag)
  }

  pub(crate) fn begin(&mut self, timestamp: Timestamp, packets: Vec<Option<Packet>>) {
    self.input_timestamp = timestamp;
    for ((_, slot), packet) in self.inputs.iter_mut().zip(packets) {
      *slot = packet;
    }
  }

  pub(crate) fn clear_inputs(&mut self) {
    for (_, slot) in self.inputs.iter_mut() {
      *slot = None;
    }
  }

  pub(crate) fn take_emitted(&mut self) -> Vec<(usize, Packet)> {
    std::mem::take(&mut self.emitted)
  }
}
