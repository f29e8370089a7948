//! # GraphBuilder
//!
//! Builder pattern for constructing graph configs with a fluent API.
//!
//! The `GraphBuilder` is the programmatic alternative to a JSON
//! [`GraphConfig`]: declare graph I/O streams, side packets and nodes, then call
//! `build()` and hand the result to
//! [`Graph::initialize`](crate::graph::Graph::initialize).

use crate::config::{GraphConfig, NodeConfig};

/// Builder for [`GraphConfig`].
///
/// # Example
///
/// ```rust
/// use packetweave::config::NodeConfig;
/// use packetweave::graph_builder::GraphBuilder;
///
/// let config = GraphBuilder::new()
///   .input_stream("in")
///   .output_stream("out")
///   .node(NodeConfig::new("PassThroughCalculator").input("in").output("out1"))
///   .node(NodeConfig::new("PassThroughCalculator").input("out1").output("out"))
///   .build();
///
/// assert_eq!(config.nodes.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
  /// Config under construction.
  config: GraphConfig,
}

impl GraphBuilder {
  /// Creates a builder for an empty graph.
  pub fn new() -> Self {
    Self::default()
  }

  /// Declares a graph input stream.
  ///
  /// # Arguments
  ///
  /// * `name` - The stream name nodes refer to and the caller pushes into
  pub fn input_stream(mut self, name: impl Into<String>) -> Self {
    self.config.input_streams.push(name.into());
    self
  }

  /// Declares a graph output stream.
  ///
  /// # Arguments
  ///
  /// * `name` - The name of a stream produced by some node
  pub fn output_stream(mut self, name: impl Into<String>) -> Self {
    self.config.output_streams.push(name.into());
    self
  }

  /// Declares an input side packet supplied at `start_run`.
  pub fn input_side_packet(mut self, name: impl Into<String>) -> Self {
    self.config.input_side_packets.push(name.into());
    self
  }

  /// Bounds every node input queue and graph input stream.
  pub fn max_queue_size(mut self, size: usize) -> Self {
    self.config.max_queue_size = Some(size);
    self
  }

  /// Adds a node. Registration order is the order nodes are listed in.
  pub fn node(mut self, node: NodeConfig) -> Self {
    self.config.nodes.push(node);
    self
  }

  /// Finishes the config.
  pub fn build(self) -> GraphConfig {
    self.config
  }
}
