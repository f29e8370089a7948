//! # packetweave
//!
//! A small, async dataflow graph runtime in pure Rust.
//!
//! Nodes (calculators) declare a typed [`Contract`](contract::Contract) of input
//! and output ports and are wired together by named streams of timestamped
//! [`Packet`](packet::Packet)s. A [`Graph`](graph::Graph) validates the wiring,
//! runs every node on its own Tokio task, synchronizes each node's inputs by
//! timestamp and hands results back through observers or pollers.
//!
//! ## Key Features
//!
//! - **Typed Contracts**: wiring errors are caught by `initialize`, before any
//!   packet moves
//! - **Timestamp Synchronization**: a node runs once per timestamp present on
//!   all of its required inputs
//! - **Strict Ordering**: every stream carries strictly increasing timestamps
//! - **Backpressure**: optional bounded queues, with a blocking and a
//!   non-blocking push
//! - **Declarative Configs**: graphs described in JSON or with
//!   [`GraphBuilder`](graph_builder::GraphBuilder), nodes created by name
//!   from a [`NodeRegistry`](registry::NodeRegistry)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use packetweave::config::GraphConfig;
//! use packetweave::graph::Graph;
//! use packetweave::registry::NodeRegistry;
//! use std::collections::HashMap;
//!
//! # async fn run() -> Result<(), packetweave::error::GraphError> {
//! let config = GraphConfig::from_json_file("graph.json")?;
//! let mut graph = Graph::new(NodeRegistry::with_builtins());
//! graph.initialize(config)?;
//! let mut poller = graph.add_output_stream_poller("out")?;
//! graph.start_run(HashMap::new())?;
//! graph.close_all_input_streams()?;
//! while let Some(packet) = poller.next().await {
//!   println!("{}", packet.timestamp());
//! }
//! graph.wait_until_done().await?;
//! # Ok(())
//! # }
//! ```

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

pub(crate) mod channels;

/// Declarative graph and node configuration.
pub mod config;
/// Port identifiers, port types and node contracts.
pub mod contract;
/// Error types for graph construction and runs.
pub mod error;
/// Graph validation and execution.
pub mod graph;
/// Builder for graph configs with a fluent API.
pub mod graph_builder;
/// Core node trait and per-call context.
pub mod node;
/// Collection of built-in nodes.
pub mod nodes;
/// Observers and pollers for reading graph output.
pub mod output;
/// Typed, timestamped packets.
pub mod packet;
/// Calculator name to node factory mapping.
pub mod registry;
/// Per-node tasks and input synchronization.
pub(crate) mod scheduler;
/// Single-consumer packet queues with ordering checks.
pub mod stream;
/// Logical timestamps.
pub mod time;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod error_test;
#[cfg(test)]
mod packet_test;
#[cfg(test)]
mod stream_test;

pub use config::{GraphConfig, NodeConfig};
pub use contract::{Contract, PortId, PortType};
pub use error::GraphError;
pub use graph::{Graph, GraphState};
pub use graph_builder::GraphBuilder;
pub use node::{Node, NodeContext, NodeExecutionError, ProcessStatus};
pub use output::{OutputStreamPoller, PacketObserver};
pub use packet::{Packet, PacketType};
pub use registry::NodeRegistry;
pub use time::Timestamp;
