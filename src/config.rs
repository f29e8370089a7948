//! # Graph Configuration
//!
//! Declarative description of a graph: its input and output streams, its side
//! packets and its nodes. Each node names a calculator (looked up in a
//! [`NodeRegistry`](crate::registry::NodeRegistry)) and lists the streams wired
//! to its ports.
//!
//! ## Stream References
//!
//! Entries in a node's `input_streams`, `output_streams` and
//! `input_side_packets` use one of three forms:
//!
//! - `name`: positional port; the n-th untagged entry is `PortId::Index(n)`
//! - `TAG:name`: `PortId::Tag("TAG", 0)`
//! - `TAG:n:name`: `PortId::Tag("TAG", n)`
//!
//! ## JSON Form
//!
//! ```json
//! {
//!   "input_streams": ["in"],
//!   "output_streams": ["out"],
//!   "nodes": [
//!     { "calculator": "PassThroughCalculator", "input_streams": ["in"], "output_streams": ["out1"] },
//!     { "calculator": "PassThroughCalculator", "input_streams": ["out1"], "output_streams": ["out"] }
//!   ]
//! }
//! ```

use crate::contract::PortId;
use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level graph description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
  /// Streams the caller feeds with `add_packet_to_input_stream`.
  pub input_streams: Vec<String>,
  /// Streams the caller reads through observers or pollers.
  pub output_streams: Vec<String>,
  /// Side packets the caller supplies to `start_run`.
  pub input_side_packets: Vec<String>,
  /// Bound for every node input queue and graph input stream; unbounded if unset.
  pub max_queue_size: Option<usize>,
  /// Nodes, in registration order.
  pub nodes: Vec<NodeConfig>,
}

impl GraphConfig {
  /// Parses a JSON config.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::InvalidConfig`] if the text is not a valid config.
  pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
    serde_json::from_str(json).map_err(|e| GraphError::InvalidConfig(e.to_string()))
  }

  /// Reads and parses a JSON config file.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::InvalidConfig`] if the file cannot be read or parsed.
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GraphError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
      .map_err(|e| GraphError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
    Self::from_json_str(&contents)
  }

  /// Serializes the config to pretty JSON.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::InvalidConfig`] if serialization fails.
  pub fn to_json_string(&self) -> Result<String, GraphError> {
    serde_json::to_string_pretty(self).map_err(|e| GraphError::InvalidConfig(e.to_string()))
  }
}

/// One node entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
  /// Registered calculator name.
  pub calculator: String,
  /// Instance name; defaults to `<calculator>_<position>`.
  pub name: Option<String>,
  /// Stream references for input ports.
  pub input_streams: Vec<String>,
  /// Stream references for output ports.
  pub output_streams: Vec<String>,
  /// Side packet references (`TAG:name` or `name`).
  pub input_side_packets: Vec<String>,
  /// Calculator-specific options.
  pub options: serde_json::Value,
}

impl NodeConfig {
  /// Starts a node entry for `calculator`.
  pub fn new(calculator: impl Into<String>) -> Self {
    Self {
      calculator: calculator.into(),
      ..Self::default()
    }
  }

  /// Sets the instance name.
  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Appends an input stream reference.
  pub fn input(mut self, reference: impl Into<String>) -> Self {
    self.input_streams.push(reference.into());
    self
  }

  /// Appends an output stream reference.
  pub fn output(mut self, reference: impl Into<String>) -> Self {
    self.output_streams.push(reference.into());
    self
  }

  /// Appends a side packet reference.
  pub fn side_packet(mut self, reference: impl Into<String>) -> Self {
    self.input_side_packets.push(reference.into());
    self
  }

  /// Replaces the calculator options.
  pub fn options(mut self, options: serde_json::Value) -> Self {
    self.options = options;
    self
  }

  /// Number of untagged input references, i.e. positional input ports.
  pub fn positional_inputs(&self) -> usize {
    self
      .input_streams
      .iter()
      .filter(|r| !r.contains(':'))
      .count()
  }

  /// Number of untagged output references, i.e. positional output ports.
  pub fn positional_outputs(&self) -> usize {
    self
      .output_streams
      .iter()
      .filter(|r| !r.contains(':'))
      .count()
  }

  /// Reads a numeric option, falling back to `default`.
  pub fn f64_option(&self, key: &str, default: f64) -> f64 {
    self.options.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
  }

  /// Reads an unsigned integer option, falling back to `default`.
  pub fn u64_option(&self, key: &str, default: u64) -> u64 {
    self.options.get(key).and_then(|v| v.as_u64()).unwrap_or(default)
  }

  /// Reads a string option, falling back to `default`.
  pub fn str_option<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
    self.options.get(key).and_then(|v| v.as_str()).unwrap_or(default)
  }
}

/// A parsed stream or side packet reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRef {
  /// Port on the node.
  pub port: PortId,
  /// Name of the stream (or side packet).
  pub name: String,
}

/// Parses a node's reference list into port/name pairs.
///
/// # Errors
///
/// Returns [`GraphError::InvalidConfig`] for empty names, empty tags, lower-case
/// tags or non-numeric tag indices.
pub fn parse_stream_refs(references: &[String]) -> Result<Vec<StreamRef>, GraphError> {
  let mut next_index = 0;
  let mut parsed = Vec::with_capacity(references.len());
  for reference in references {
    let parts: Vec<&str> = reference.split(':').collect();
    let (port, name) = match parts.as_slice() {
      [name] => {
        let port = PortId::Index(next_index);
        next_index += 1;
        (port, *name)
      }
      [tag, name] => (PortId::Tag(check_tag(tag, reference)?, 0), *name),
      [tag, index, name] => {
        let index = index
          .parse::<usize>()
          .map_err(|_| GraphError::InvalidConfig(format!("bad tag index in '{}'", reference)))?;
        (PortId::Tag(check_tag(tag, reference)?, index), *name)
      }
      _ => {
        return Err(GraphError::InvalidConfig(format!(
          "malformed stream reference '{}'",
          reference
        )));
      }
    };
    if name.is_empty() {
      return Err(GraphError::InvalidConfig(format!(
        "empty stream name in '{}'",
        reference
      )));
    }
    parsed.push(StreamRef {
      port,
      name: name.to_string(),
    });
  }
  Ok(parsed)
}

fn check_tag(tag: &str, reference: &str) -> Result<String, GraphError> {
  let valid = !tag.is_empty()
    && tag
      .chars()
      .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
  if valid {
    Ok(tag.to_string())
  } else {
    Err(GraphError::InvalidConfig(format!(
      "tag in '{}' must be upper-case",
      reference
    )))
  }
}
