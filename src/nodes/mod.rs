//! # Built-in Nodes
//!
//! Reusable calculators registered by
//! [`NodeRegistry::with_builtins`](crate::registry::NodeRegistry::with_builtins).
//!
//! ## Node Categories
//!
//! - **Source Nodes**: [`string_source_node`] (0 inputs, 1 output)
//! - **Transform Nodes**: [`map_node`], [`pass_through_node`]

pub mod map_node;
pub mod pass_through_node;
pub mod string_source_node;


pub use map_node::MapNode;
pub use pass_through_node::PassThroughNode;
pub use string_source_node::StringSourceNode;
