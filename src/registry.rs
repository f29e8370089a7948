//! # Node Registry
//!
//! Maps calculator names used in a [`GraphConfig`](crate::config::GraphConfig)
//! to factories that build node instances.
//!
//! The registry is an ordinary value owned by whoever builds the graph. There is
//! no process-wide table: a graph only knows the calculators registered in the
//! registry it was created with.
//!
//! ```rust
//! use packetweave::nodes::map_node::MapNode;
//! use packetweave::registry::NodeRegistry;
//!
//! let mut registry = NodeRegistry::with_builtins();
//! registry.register("NegateCalculator", |_config| {
//!   Ok(Box::new(MapNode::new(|x: &f64| Ok(-*x))))
//! });
//! assert!(registry.contains("NegateCalculator"));
//! assert!(registry.contains("PassThroughCalculator"));
//! ```

use crate::config::NodeConfig;
use crate::error::GraphError;
use crate::node::{Node, NodeExecutionError};
use crate::nodes::map_node::MapNode;
use crate::nodes::pass_through_node::PassThroughNode;
use crate::nodes::string_source_node::StringSourceNode;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builds a node instance from its config entry.
pub type NodeFactory =
  Arc<dyn Fn(&NodeConfig) -> Result<Box<dyn Node>, NodeExecutionError> + Send + Sync>;

/// Name → factory table.
#[derive(Clone, Default)]
pub struct NodeRegistry {
  factories: BTreeMap<String, NodeFactory>,
}

impl NodeRegistry {
  /// Creates an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a registry holding the built-in calculators:
  ///
  /// - `PassThroughCalculator` ([`PassThroughNode`])
  /// - `ScaleCalculator` ([`MapNode`] over `f64`, option `factor`, default 1.0)
  /// - `StringSourceCalculator` ([`StringSourceNode`])
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.register("PassThroughCalculator", |config| {
      Ok(Box::new(PassThroughNode::from_config(config)?))
    });
    registry.register("ScaleCalculator", |config| {
      let factor = config.f64_option("factor", 1.0);
      Ok(Box::new(MapNode::new(move |x: &f64| Ok(x * factor))))
    });
    registry.register("StringSourceCalculator", |config| {
      Ok(Box::new(StringSourceNode::from_config(config)))
    });
    registry
  }

  /// Registers (or replaces) the factory for `name`.
  pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
  where
    F: Fn(&NodeConfig) -> Result<Box<dyn Node>, NodeExecutionError> + Send + Sync + 'static,
  {
    self.factories.insert(name.into(), Arc::new(factory));
    self
  }

  /// Returns `true` if a factory is registered for `name`.
  pub fn contains(&self, name: &str) -> bool {
    self.factories.contains_key(name)
  }

  /// Registered names, sorted.
  pub fn names(&self) -> Vec<&str> {
    self.factories.keys().map(String::as_str).collect()
  }

  /// Builds the node described by `config`.
  ///
  /// # Errors
  ///
  /// - [`GraphError::UnknownCalculator`] if nothing is registered under
  ///   `config.calculator`
  /// - [`GraphError::NodeConstruction`] if the factory fails
  pub fn create(&self, config: &NodeConfig) -> Result<Box<dyn Node>, GraphError> {
    let factory = self
      .factories
      .get(&config.calculator)
      .ok_or_else(|| GraphError::UnknownCalculator {
        calculator: config.calculator.clone(),
      })?;
    factory(config).map_err(|source| GraphError::NodeConstruction {
      calculator: config.calculator.clone(),
      source,
    })
  }
}

impl fmt::Debug for NodeRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NodeRegistry")
      .field("calculators", &self.names())
      .finish()
  }
}
