//! # Pass-Through Chain Example
//!
//! Builds a graph from JSON with two chained pass-through nodes mirroring
//! three typed streams, observes every output and feeds a few packets per
//! stream.

use packetweave::{Graph, GraphConfig, NodeRegistry, Packet, Timestamp};
use std::collections::HashMap;

const CONFIG: &str = r#"{
  "input_streams": ["float_value", "int_value", "bool_value"],
  "output_streams": ["passed_float_value", "passed_int_value", "passed_bool_value"],
  "nodes": [
    {
      "calculator": "PassThroughCalculator",
      "name": "first",
      "input_streams": ["float_value", "int_value", "bool_value"],
      "output_streams": ["float_1", "int_1", "bool_1"]
    },
    {
      "calculator": "PassThroughCalculator",
      "name": "second",
      "input_streams": ["float_1", "int_1", "bool_1"],
      "output_streams": ["passed_float_value", "passed_int_value", "passed_bool_value"]
    }
  ]
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt::init();

  let config = GraphConfig::from_json_str(CONFIG)?;
  let mut graph = Graph::new(NodeRegistry::with_builtins());
  graph.initialize(config)?;

  graph.observe_output_stream("passed_float_value", |packet| {
    println!("{} float {}", packet.timestamp(), packet.get::<f64>()?);
    Ok(())
  })?;
  graph.observe_output_stream("passed_int_value", |packet| {
    println!("{} int   {}", packet.timestamp(), packet.get::<i32>()?);
    Ok(())
  })?;
  graph.observe_output_stream("passed_bool_value", |packet| {
    println!("{} bool  {}", packet.timestamp(), packet.get::<bool>()?);
    Ok(())
  })?;

  graph.start_run(HashMap::new())?;
  for i in 0..5 {
    let ts = Timestamp::new(i);
    graph
      .add_packet_to_input_stream("float_value", Packet::new(i as f64 * 1.5, ts))
      .await?;
    graph
      .add_packet_to_input_stream("int_value", Packet::new(i as i32 * 10, ts))
      .await?;
    // bool only on even timestamps; the node forwards whatever is present
    if i % 2 == 0 {
      graph
        .add_packet_to_input_stream("bool_value", Packet::new(i % 4 == 0, ts))
        .await?;
    }
  }

  graph.close_all_input_streams()?;
  graph.wait_until_done().await?;
  println!("graph finished: {}", graph.state());
  Ok(())
}
