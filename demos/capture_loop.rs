//! # Capture Loop Example
//!
//! Drives a graph one frame at a time the way a camera loop would: push a
//! frame stamped with microseconds since capture start, then block on the
//! poller for the processed frame before grabbing the next one.
//!
//! Frames are synthetic gradients; pass a frame count as the first argument
//! (default 30).

use async_trait::async_trait;
use packetweave::{
  Contract, Graph, GraphBuilder, Node, NodeConfig, NodeContext, NodeExecutionError, NodeRegistry,
  Packet, ProcessStatus, Timestamp,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

const INPUT_STREAM: &str = "input_video";
const OUTPUT_STREAM: &str = "output_video";

/// Packed single-channel image.
struct Frame {
  width: usize,
  height: usize,
  pixels: Vec<u8>,
}

impl Frame {
  fn gradient(width: usize, height: usize, offset: usize) -> Self {
    let pixels = (0..width * height)
      .map(|i| ((i % width + offset) % 256) as u8)
      .collect();
    Self {
      width,
      height,
      pixels,
    }
  }
}

/// Flips frames horizontally (selfie view).
struct MirrorCalculator;

#[async_trait]
impl Node for MirrorCalculator {
  fn contract(&self) -> Contract {
    Contract::new().input::<Frame>(0).output::<Frame>(0)
  }

  async fn process(&mut self, cx: &mut NodeContext) -> Result<ProcessStatus, NodeExecutionError> {
    let frame = cx.input(0).ok_or("missing frame")?.get::<Frame>()?;
    let pixels = frame
      .pixels
      .chunks(frame.width)
      .flat_map(|row| row.iter().rev().copied())
      .collect();
    let mirrored = Frame {
      width: frame.width,
      height: frame.height,
      pixels,
    };
    let timestamp = cx.input_timestamp();
    cx.emit(0, Packet::new(mirrored, timestamp))?;
    Ok(ProcessStatus::Continue)
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt::init();

  let frames: usize = match std::env::args().nth(1) {
    Some(arg) => arg.parse()?,
    None => 30,
  };

  let mut registry = NodeRegistry::with_builtins();
  registry.register("MirrorCalculator", |_config| Ok(Box::new(MirrorCalculator)));

  let config = GraphBuilder::new()
    .input_stream(INPUT_STREAM)
    .output_stream(OUTPUT_STREAM)
    .max_queue_size(2)
    .node(
      NodeConfig::new("MirrorCalculator")
        .input(INPUT_STREAM)
        .output(OUTPUT_STREAM),
    )
    .build();

  info!("initialize the graph");
  let mut graph = Graph::new(registry);
  graph.initialize(config)?;
  let mut poller = graph.add_output_stream_poller(OUTPUT_STREAM)?;
  graph.start_run(HashMap::new())?;

  info!(frames, "start grabbing and processing frames");
  let start = Instant::now();
  for index in 0..frames {
    let frame = Frame::gradient(64, 48, index);
    let micros = i64::try_from(start.elapsed().as_micros())?;
    graph
      .add_packet_to_input_stream(INPUT_STREAM, Packet::new(frame, Timestamp::new(micros)))
      .await?;

    let Some(packet) = poller.next().await else {
      break;
    };
    let output = packet.get::<Frame>()?;
    println!(
      "frame {index} at {}us: {}x{}, first pixel {}",
      packet.timestamp(),
      output.width,
      output.height,
      output.pixels[0]
    );
    // ~30 fps
    tokio::time::sleep(Duration::from_millis(33)).await;
  }

  info!("shutting down");
  graph.close_input_stream(INPUT_STREAM)?;
  graph.wait_until_done().await?;
  Ok(())
}
