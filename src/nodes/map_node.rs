//! # Map Node
//!
//! A transform node that applies a typed function to each input packet.
//!
//! ## Ports
//!
//! - **Input**: `#0` - Receives values of type `I`
//! - **Output**: `#0` - Sends the function's result, of type `O`, at the input timestamp
//!
//! A function error fails the graph run with
//! [`GraphError::NodeProcess`](crate::error::GraphError::NodeProcess).

use crate::contract::Contract;
use crate::node::{Node, NodeContext, NodeExecutionError, ProcessStatus};
use crate::packet::Packet;
use async_trait::async_trait;
use std::any::Any;
use std::marker::PhantomData;

/// Boxed transform function used by [`MapNode`].
pub type MapFunction<I, O> = Box<dyn Fn(&I) -> Result<O, NodeExecutionError> + Send + Sync>;

/// Single-input, single-output transform over typed values.
///
/// # Example
///
/// ```rust
/// use packetweave::nodes::map_node::MapNode;
///
/// let double = MapNode::new(|x: &f64| Ok(x * 2.0));
/// let length = MapNode::new(|s: &String| Ok(s.len()));
/// # let _ = (double, length);
/// ```
pub struct MapNode<I, O> {
  function: MapFunction<I, O>,
  _types: PhantomData<fn(&I) -> O>,
}

impl<I, O> MapNode<I, O>
where
  I: Any + Send + Sync,
  O: Any + Send + Sync,
{
  /// Creates a map node from `function`.
  ///
  /// # Arguments
  ///
  /// * `function` - Called once per input packet; its `Ok` value becomes the
  ///   output packet at the same timestamp
  pub fn new<F>(function: F) -> Self
  where
    F: Fn(&I) -> Result<O, NodeExecutionError> + Send + Sync + 'static,
  {
    Self {
      function: Box::new(function),
      _types: PhantomData,
    }
  }
}

#[async_trait]
impl<I, O> Node for MapNode<I, O>
where
  I: Any + Send + Sync,
  O: Any + Send + Sync,
{
  fn contract(&self) -> Contract {
    Contract::new().input::<I>(0).output::<O>(0)
  }

  async fn process(&mut self, cx: &mut NodeContext) -> Result<ProcessStatus, NodeExecutionError> {
    let value = cx.input(0).ok_or("missing input #0")?.get::<I>()?;
    let mapped = (self.function)(value)?;
    let timestamp = cx.input_timestamp();
    cx.emit(0, Packet::new(mapped, timestamp))?;
    Ok(ProcessStatus::Continue)
  }
}
