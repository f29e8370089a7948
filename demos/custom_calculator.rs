//! # Custom Calculator Example
//!
//! Defines a calculator that doubles `f64` values, registers it by name and
//! runs it over a handful of packets, printing each result from an observer.

use async_trait::async_trait;
use packetweave::{
  Contract, Graph, GraphBuilder, Node, NodeConfig, NodeContext, NodeExecutionError, NodeRegistry,
  Packet, ProcessStatus, Timestamp,
};
use std::collections::HashMap;

/// One `f64` input, one `f64` output at the same timestamp.
struct DoublerCalculator;

#[async_trait]
impl Node for DoublerCalculator {
  fn contract(&self) -> Contract {
    Contract::new().input::<f64>(0).output::<f64>(0)
  }

  async fn process(&mut self, cx: &mut NodeContext) -> Result<ProcessStatus, NodeExecutionError> {
    let x = *cx.input(0).ok_or("missing input")?.get::<f64>()?;
    let timestamp = cx.input_timestamp();
    cx.emit(0, Packet::new(x * 2.0, timestamp))?;
    Ok(ProcessStatus::Continue)
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt::init();

  let mut registry = NodeRegistry::with_builtins();
  registry.register("DoublerCalculator", |_config| Ok(Box::new(DoublerCalculator)));

  let config = GraphBuilder::new()
    .input_stream("in")
    .output_stream("out")
    .node(NodeConfig::new("DoublerCalculator").input("in").output("out"))
    .build();

  let mut graph = Graph::new(registry);
  graph.initialize(config)?;
  graph.observe_output_stream("out", |packet| {
    println!("{}: {}", packet.timestamp(), packet.get::<f64>()?);
    Ok(())
  })?;

  graph.start_run(HashMap::new())?;
  for i in 0..13 {
    let packet = Packet::new(i as f64 * 0.1, Timestamp::new(i));
    graph.add_packet_to_input_stream("in", packet).await?;
  }
  graph.close_input_stream("in")?;
  graph.wait_until_done().await?;
  Ok(())
}
