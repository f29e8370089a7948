//! # Graph Pass-Through Benchmark
//!
//! Benchmarks graphs with a single pass-through node, fed by one or two inputs.
//! Measures throughput of packets flowing through the scheduler.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use packetweave::{Graph, GraphBuilder, NodeConfig, NodeRegistry, Packet, Timestamp};
use std::collections::HashMap;

/// Runs `graph` over `count` packets. Uses a current_thread runtime to match
/// #[tokio::test] behavior.
fn run_sync(count: usize, graph: fn() -> GraphBuilder, inputs: &'static [&'static str]) {
  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .unwrap();
  rt.block_on(run(count, graph(), inputs));
}

async fn run(count: usize, builder: GraphBuilder, inputs: &[&str]) {
  let mut graph = Graph::new(NodeRegistry::with_builtins());
  graph.initialize(builder.build()).unwrap();
  let mut poller = graph.add_output_stream_poller("out").unwrap();
  graph.start_run(HashMap::new()).unwrap();

  for i in 0..count {
    for input in inputs {
      graph
        .add_packet_to_input_stream(input, Packet::new(i as f64, Timestamp::new(i as i64)))
        .await
        .unwrap();
    }
  }
  graph.close_all_input_streams().unwrap();

  let mut received = 0;
  while poller.next().await.is_some() {
    received += 1;
  }
  graph.wait_until_done().await.unwrap();
  assert_eq!(received, count);
}

fn pass_through() -> GraphBuilder {
  GraphBuilder::new()
    .input_stream("in")
    .output_stream("out")
    .node(NodeConfig::new("PassThroughCalculator").input("in").output("out"))
}

fn two_inputs() -> GraphBuilder {
  GraphBuilder::new()
    .input_stream("a")
    .input_stream("b")
    .output_stream("out")
    .node(
      NodeConfig::new("PassThroughCalculator")
        .input("a")
        .input("b")
        .output("out")
        .output("unused"),
    )
}

fn graph_pass_through_benchmark(c: &mut Criterion) {
  let mut group = c.benchmark_group("graph_pass_through");
  group.sample_size(10);
  group.warm_up_time(std::time::Duration::from_secs(1));
  group.measurement_time(std::time::Duration::from_secs(3));

  for size in [100, 1000, 10000].iter() {
    group.throughput(Throughput::Elements(*size as u64));
    group.bench_with_input(BenchmarkId::new("single", size), size, |b, &size| {
      b.iter(|| run_sync(size, pass_through, &["in"]));
    });
    group.bench_with_input(BenchmarkId::new("two_inputs", size), size, |b, &size| {
      b.iter(|| run_sync(size, two_inputs, &["a", "b"]));
    });
  }

  group.finish();
}

criterion_group!(benches, graph_pass_through_benchmark);
criterion_main!(benches);
