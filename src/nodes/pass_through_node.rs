//! # Pass-Through Node
//!
//! Forwards every input packet, unchanged, to the output port with the same id.
//!
//! ## Ports
//!
//! - **Input**: one optional port per wired input reference (any type)
//! - **Output**: one port per input, with the same [`PortId`]
//!
//! Because the inputs are optional, a timestamp present on only some inputs is
//! still forwarded on those ports.

use crate::config::{NodeConfig, parse_stream_refs};
use crate::contract::{Contract, PortId};
use crate::error::GraphError;
use crate::node::{Node, NodeContext, NodeExecutionError, ProcessStatus};
use async_trait::async_trait;

/// Identity node over any number of streams.
pub struct PassThroughNode {
  /// Ports forwarded, input id == output id.
  ports: Vec<PortId>,
}

impl PassThroughNode {
  /// Creates a node forwarding `count` positional ports.
  pub fn new(count: usize) -> Self {
    Self {
      ports: (0..count).map(PortId::Index).collect(),
    }
  }

  /// Creates a node whose ports mirror the input references of `config`.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::InvalidConfig`] if a reference is malformed.
  pub fn from_config(config: &NodeConfig) -> Result<Self, GraphError> {
    let ports = parse_stream_refs(&config.input_streams)?
      .into_iter()
      .map(|stream_ref| stream_ref.port)
      .collect();
    Ok(Self { ports })
  }

  /// Ports this node forwards.
  pub fn ports(&self) -> &[PortId] {
    &self.ports
  }
}

#[async_trait]
impl Node for PassThroughNode {
  fn contract(&self) -> Contract {
    self.ports.iter().fold(Contract::new(), |contract, port| {
      contract
        .optional_input_any(port.clone())
        .output_any(port.clone())
    })
  }

  async fn process(&mut self, cx: &mut NodeContext) -> Result<ProcessStatus, NodeExecutionError> {
    for port in &self.ports {
      if let Some(packet) = cx.input(port.clone()).cloned() {
        cx.emit(port.clone(), packet)?;
      }
    }
    Ok(ProcessStatus::Continue)
  }
}
