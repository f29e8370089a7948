//! # String Source Example
//!
//! A graph with no input streams: a source node produces strings until its
//! count is reached, and the caller drains them through a poller.

use packetweave::{Graph, GraphBuilder, NodeConfig, NodeRegistry};
use std::collections::HashMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt::init();

  let config = GraphBuilder::new()
    .output_stream("out")
    .node(
      NodeConfig::new("StringSourceCalculator")
        .named("source")
        .output("STR:strings")
        .options(serde_json::json!({ "prefix": "goblin", "count": 5 })),
    )
    .node(NodeConfig::new("PassThroughCalculator").input("strings").output("out"))
    .build();

  let mut graph = Graph::new(NodeRegistry::with_builtins());
  graph.initialize(config)?;
  let mut poller = graph.add_output_stream_poller("out")?;
  graph.start_run(HashMap::new())?;

  while let Some(packet) = poller.next().await {
    println!("{}: {}", packet.timestamp(), packet.get::<String>()?);
  }

  graph.wait_until_done().await?;
  Ok(())
}
