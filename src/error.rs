//! # Error Handling
//!
//! Error types for graph construction and graph runs.
//!
//! ## Error Kinds
//!
//! - **Build-time** (returned by [`Graph::initialize`](crate::graph::Graph::initialize)):
//!   `ContractMismatch`, `DanglingStream`, `DuplicateStream`, `UnknownCalculator`,
//!   `NodeConstruction`, `Cycle`, `InvalidConfig`
//! - **Push-time** (returned to the caller of the offending push):
//!   `OrderingViolation`, `StreamClosed`, `StreamFull`, `TypeMismatch`, `UnknownStream`
//! - **Run-time** (recorded once and reported by
//!   [`Graph::wait_until_done`](crate::graph::Graph::wait_until_done)):
//!   `NodeProcess`, `Observer`, and any push-time kind raised while a node emits
//!
//! Only `StreamFull` is retryable. There is no retry at this layer; callers that
//! want one wrap their own pushes.
//!
//! Stopping a source node is not an error and has no variant here, see
//! [`ProcessStatus::Stop`](crate::node::ProcessStatus::Stop).

use crate::node::NodeExecutionError;
use crate::time::Timestamp;
use thiserror::Error;

/// Errors produced while building or running a graph.
#[derive(Error, Debug)]
pub enum GraphError {
  /// A node's declared contract disagrees with its wiring or with the type of a
  /// connected stream.
  #[error("contract mismatch on node '{node}': {detail}")]
  ContractMismatch {
    /// Node whose contract was violated.
    node: String,
    /// Human-readable description of the disagreement.
    detail: String,
  },
  /// A stream is consumed (or exported) but nothing produces it.
  #[error("stream '{stream}' consumed by '{consumer}' has no producer")]
  DanglingStream {
    /// Name of the stream without a producer.
    stream: String,
    /// Node name, or `"graph output"`, that consumes it.
    consumer: String,
  },
  /// Two producers write the same stream name.
  #[error("stream '{stream}' has more than one producer")]
  DuplicateStream {
    /// Name of the stream.
    stream: String,
  },
  /// No factory is registered for the calculator name.
  #[error("no calculator registered under '{calculator}'")]
  UnknownCalculator {
    /// The requested calculator name.
    calculator: String,
  },
  /// A registered factory failed to construct its node.
  #[error("failed to construct calculator '{calculator}': {source}")]
  NodeConstruction {
    /// The calculator name.
    calculator: String,
    /// Error returned by the factory.
    source: NodeExecutionError,
  },
  /// A stream name is not part of the graph (or not of the requested kind).
  #[error("unknown stream '{stream}'")]
  UnknownStream {
    /// The requested stream name.
    stream: String,
  },
  /// The node wiring contains a cycle.
  #[error("graph contains a cycle through nodes {nodes:?}")]
  Cycle {
    /// Nodes that could not be ordered.
    nodes: Vec<String>,
  },
  /// A packet was pushed with a timestamp not greater than the previous one.
  #[error("stream '{stream}': timestamp {timestamp} is not after previous timestamp {last}")]
  OrderingViolation {
    /// Stream receiving the packet.
    stream: String,
    /// Timestamp of the previous packet on the stream.
    last: Timestamp,
    /// Offending timestamp.
    timestamp: Timestamp,
  },
  /// A packet was pushed to a closed stream.
  #[error("stream '{stream}' is closed")]
  StreamClosed {
    /// Name of the closed stream.
    stream: String,
  },
  /// A bounded stream is at capacity. Retryable.
  #[error("stream '{stream}' is full")]
  StreamFull {
    /// Name of the full stream.
    stream: String,
  },
  /// A packet's value type does not match the type declared for the stream.
  #[error("stream '{stream}' expects {expected} but packet holds {actual}")]
  TypeMismatch {
    /// Stream receiving the packet.
    stream: String,
    /// Declared type name.
    expected: &'static str,
    /// Type name of the packet's value.
    actual: &'static str,
  },
  /// A node's `open`, `process` or `close` returned an error.
  #[error("node '{node}' failed: {source}")]
  NodeProcess {
    /// Name of the failing node.
    node: String,
    /// The node's own error, unchanged.
    source: NodeExecutionError,
  },
  /// An output stream observer returned an error.
  #[error("observer on stream '{stream}' failed: {source}")]
  Observer {
    /// Observed stream.
    stream: String,
    /// The observer's error, unchanged.
    source: NodeExecutionError,
  },
  /// A side packet wired in the config was not supplied to `start_run`.
  #[error("input side packet '{name}' was not provided")]
  MissingSidePacket {
    /// Name of the missing side packet.
    name: String,
  },
  /// An operation was called in a graph state that does not allow it.
  #[error("cannot {operation} while graph is {state}")]
  InvalidState {
    /// The attempted operation.
    operation: &'static str,
    /// Current graph state.
    state: String,
  },
  /// The graph configuration could not be read or is malformed.
  #[error("invalid graph config: {0}")]
  InvalidConfig(String),
}

impl GraphError {
  /// Returns `true` if retrying the same operation later may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, GraphError::StreamFull { .. })
  }

  /// Returns `true` for errors detected while validating a config, before any
  /// execution.
  pub fn is_build_error(&self) -> bool {
    matches!(
      self,
      GraphError::ContractMismatch { .. }
        | GraphError::DanglingStream { .. }
        | GraphError::DuplicateStream { .. }
        | GraphError::UnknownCalculator { .. }
        | GraphError::NodeConstruction { .. }
        | GraphError::Cycle { .. }
        | GraphError::InvalidConfig(_)
    )
  }
}

/// Returned by [`Packet::get`](crate::packet::Packet::get) when the packet holds
/// a different type than requested.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("packet holds {actual}, not {expected}")]
pub struct PacketTypeError {
  /// Requested type name.
  pub expected: &'static str,
  /// Type name of the packet's value.
  pub actual: &'static str,
}
