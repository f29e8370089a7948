//! # Node Contracts
//!
//! A [`Contract`] is a node's declaration of the ports it reads and writes and
//! the type each port carries. The graph asks every node for its contract once,
//! during [`Graph::initialize`](crate::graph::Graph::initialize), and validates
//! the configured wiring against it before anything runs.
//!
//! Ports are addressed by [`PortId`]: either a position (`Index(0)`, `Index(1)`,
//! ...) or a tag with an index within that tag (`Tag("STR", 0)`). In a graph
//! config, untagged stream references map to positional ports and `TAG:name`
//! references map to tagged ports.
//!
//! ## Example
//!
//! ```rust
//! use packetweave::contract::{Contract, PortId};
//!
//! // One f64 in, one f64 out, plus an optional text annotation.
//! let contract = Contract::new()
//!   .input::<f64>(0)
//!   .optional_input::<String>("NOTE")
//!   .output::<f64>(0);
//!
//! assert_eq!(contract.inputs().len(), 2);
//! assert!(contract.find_input(&PortId::tag("NOTE")).unwrap().optional);
//! ```

use crate::packet::PacketType;
use std::any::Any;
use std::fmt;

/// Identifies one port of a node.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum PortId {
  /// Positional port.
  Index(usize),
  /// Tagged port; the `usize` distinguishes repeated tags.
  Tag(String, usize),
}

impl PortId {
  /// Positional port `index`.
  pub fn index(index: usize) -> Self {
    PortId::Index(index)
  }

  /// First port with `tag`.
  pub fn tag(tag: impl Into<String>) -> Self {
    PortId::Tag(tag.into(), 0)
  }
}

impl From<usize> for PortId {
  fn from(index: usize) -> Self {
    PortId::Index(index)
  }
}

impl From<&str> for PortId {
  fn from(tag: &str) -> Self {
    PortId::Tag(tag.to_string(), 0)
  }
}

impl From<(&str, usize)> for PortId {
  fn from((tag, index): (&str, usize)) -> Self {
    PortId::Tag(tag.to_string(), index)
  }
}

impl fmt::Display for PortId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PortId::Index(index) => write!(f, "#{}", index),
      PortId::Tag(tag, 0) => write!(f, "{}", tag),
      PortId::Tag(tag, index) => write!(f, "{}:{}", tag, index),
    }
  }
}

/// Type a port accepts or produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortType {
  /// Any value type; checked, if at all, by the other end of the edge.
  Any,
  /// Exactly this value type.
  Exact(PacketType),
}

impl PortType {
  /// Port type for values of `T`.
  pub fn of<T: Any>() -> Self {
    PortType::Exact(PacketType::of::<T>())
  }

  /// Returns `true` if a packet of `packet_type` may travel through this port.
  pub fn accepts(&self, packet_type: &PacketType) -> bool {
    match self {
      PortType::Any => true,
      PortType::Exact(expected) => expected == packet_type,
    }
  }

  /// Returns `true` if the two ends of an edge can agree on a type.
  pub fn compatible_with(&self, other: &PortType) -> bool {
    match (self, other) {
      (PortType::Exact(a), PortType::Exact(b)) => a == b,
      _ => true,
    }
  }

  /// Type name for messages; `"any"` for [`PortType::Any`].
  pub fn name(&self) -> &'static str {
    match self {
      PortType::Any => "any",
      PortType::Exact(packet_type) => packet_type.name(),
    }
  }
}

/// Declaration of one port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSpec {
  /// Port identifier.
  pub id: PortId,
  /// Accepted or produced type.
  pub port_type: PortType,
  /// Whether the node may run without a packet on this port (inputs only).
  pub optional: bool,
}

/// Declared inputs, outputs and side packets of a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Contract {
  inputs: Vec<PortSpec>,
  outputs: Vec<PortSpec>,
  side_packets: Vec<String>,
}

impl Contract {
  /// Creates an empty contract (a node with no ports).
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a required input of type `T`.
  pub fn input<T: Any>(self, id: impl Into<PortId>) -> Self {
    self.with_input(id.into(), PortType::of::<T>(), false)
  }

  /// Adds an optional input of type `T`.
  pub fn optional_input<T: Any>(self, id: impl Into<PortId>) -> Self {
    self.with_input(id.into(), PortType::of::<T>(), true)
  }

  /// Adds a required input accepting any type.
  pub fn input_any(self, id: impl Into<PortId>) -> Self {
    self.with_input(id.into(), PortType::Any, false)
  }

  /// Adds an optional input accepting any type.
  pub fn optional_input_any(self, id: impl Into<PortId>) -> Self {
    self.with_input(id.into(), PortType::Any, true)
  }

  /// Adds an output of type `T`.
  pub fn output<T: Any>(self, id: impl Into<PortId>) -> Self {
    self.with_output(id.into(), PortType::of::<T>())
  }

  /// Adds an output of any type.
  pub fn output_any(self, id: impl Into<PortId>) -> Self {
    self.with_output(id.into(), PortType::Any)
  }

  /// Declares a required input side packet under `tag`.
  pub fn side_packet(mut self, tag: impl Into<String>) -> Self {
    self.side_packets.push(tag.into());
    self
  }

  fn with_input(mut self, id: PortId, port_type: PortType, optional: bool) -> Self {
    self.inputs.push(PortSpec {
      id,
      port_type,
      optional,
    });
    self
  }

  fn with_output(mut self, id: PortId, port_type: PortType) -> Self {
    self.outputs.push(PortSpec {
      id,
      port_type,
      optional: false,
    });
    self
  }

  /// Input port declarations, in declaration order.
  pub fn inputs(&self) -> &[PortSpec] {
    &self.inputs
  }

  /// Output port declarations, in declaration order.
  pub fn outputs(&self) -> &[PortSpec] {
    &self.outputs
  }

  /// Declared side packet tags.
  pub fn side_packets(&self) -> &[String] {
    &self.side_packets
  }

  /// Looks up an input declaration.
  pub fn find_input(&self, id: &PortId) -> Option<&PortSpec> {
    self.inputs.iter().find(|spec| &spec.id == id)
  }

  /// Looks up an output declaration.
  pub fn find_output(&self, id: &PortId) -> Option<&PortSpec> {
    self.outputs.iter().find(|spec| &spec.id == id)
  }

  /// Returns `true` if the node has no inputs at all.
  pub fn is_source(&self) -> bool {
    self.inputs.is_empty()
  }

  /// Returns the first port id declared twice on the same side, if any.
  pub fn duplicate_port(&self) -> Option<&PortId> {
    for ports in [&self.inputs, &self.outputs] {
      for (i, spec) in ports.iter().enumerate() {
        if ports[..i].iter().any(|earlier| earlier.id == spec.id) {
          return Some(&spec.id);
        }
      }
    }
    None
  }
}
