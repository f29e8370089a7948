//! # String Source Node
//!
//! A source node (no inputs) that emits a fixed number of numbered strings and
//! then stops.
//!
//! ## Ports
//!
//! - **Output**: `STR` - `String` values `"{prefix}0"`, `"{prefix}1"`, ... at
//!   timestamps `0, 1, ...`
//!
//! ## Options
//!
//! - `prefix` (string, default `"packet"`)
//! - `count` (unsigned integer, default `10`)

use crate::config::NodeConfig;
use crate::contract::Contract;
use crate::node::{Node, NodeContext, NodeExecutionError, ProcessStatus};
use crate::packet::Packet;
use crate::time::Timestamp;
use async_trait::async_trait;

/// Output tag of [`StringSourceNode`].
pub const STRING_SOURCE_TAG: &str = "STR";

/// Emits `count` strings then returns [`ProcessStatus::Stop`].
pub struct StringSourceNode {
  prefix: String,
  count: u64,
  /// Next value to emit; doubles as the next timestamp.
  next: u64,
}

impl StringSourceNode {
  /// Creates a source emitting `count` strings starting with `prefix`.
  pub fn new(prefix: impl Into<String>, count: u64) -> Self {
    Self {
      prefix: prefix.into(),
      count,
      next: 0,
    }
  }

  /// Creates a source from the `prefix` and `count` options of `config`.
  pub fn from_config(config: &NodeConfig) -> Self {
    Self::new(
      config.str_option("prefix", "packet"),
      config.u64_option("count", 10),
    )
  }
}

#[async_trait]
impl Node for StringSourceNode {
  fn contract(&self) -> Contract {
    Contract::new().output::<String>(STRING_SOURCE_TAG)
  }

  async fn process(&mut self, cx: &mut NodeContext) -> Result<ProcessStatus, NodeExecutionError> {
    if self.next >= self.count {
      return Ok(ProcessStatus::Stop);
    }
    let value = format!("{}{}", self.prefix, self.next);
    let timestamp = Timestamp::new(i64::try_from(self.next)?);
    cx.emit(STRING_SOURCE_TAG, Packet::new(value, timestamp))?;
    self.next += 1;
    Ok(ProcessStatus::Continue)
  }
}
