//! End-to-end graph scenarios exercised through the public API only.

use async_trait::async_trait;
use futures::StreamExt;
use packetweave::{
  Contract, Graph, GraphBuilder, GraphConfig, GraphError, GraphState, Node, NodeConfig, NodeContext,
  NodeExecutionError, NodeRegistry, Packet, ProcessStatus, Timestamp,
};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// A calculator that doubles f64 values
struct DoubleCalculator;

#[async_trait]
impl Node for DoubleCalculator {
  fn contract(&self) -> Contract {
    Contract::new().input::<f64>(0).output::<f64>(0)
  }

  async fn process(&mut self, cx: &mut NodeContext) -> Result<ProcessStatus, NodeExecutionError> {
    let x = *cx.input(0).ok_or("missing input")?.get::<f64>()?;
    cx.emit(0, Packet::new(x * 2.0, cx.input_timestamp()))?;
    Ok(ProcessStatus::Continue)
  }
}

// A calculator with two required inputs that counts its invocations
struct JoinCalculator {
  invocations: Arc<Mutex<Vec<i64>>>,
}

#[async_trait]
impl Node for JoinCalculator {
  fn contract(&self) -> Contract {
    Contract::new()
      .input::<i64>("LEFT")
      .input::<i64>("RIGHT")
      .output::<i64>("SUM")
  }

  async fn process(&mut self, cx: &mut NodeContext) -> Result<ProcessStatus, NodeExecutionError> {
    let left = *cx.input("LEFT").ok_or("missing left")?.get::<i64>()?;
    let right = *cx.input("RIGHT").ok_or("missing right")?.get::<i64>()?;
    self
      .invocations
      .lock()
      .map_err(|e| e.to_string())?
      .push(cx.input_timestamp().value());
    cx.emit("SUM", Packet::new(left + right, cx.input_timestamp()))?;
    Ok(ProcessStatus::Continue)
  }
}

fn registry_with_join(invocations: Arc<Mutex<Vec<i64>>>) -> NodeRegistry {
  let mut registry = NodeRegistry::with_builtins();
  registry
    .register("DoubleCalculator", |_config| Ok(Box::new(DoubleCalculator)))
    .register("JoinCalculator", move |_config| {
      Ok(Box::new(JoinCalculator {
        invocations: Arc::clone(&invocations),
      }))
    });
  registry
}

fn join_config() -> GraphConfig {
  GraphBuilder::new()
    .input_stream("left")
    .input_stream("right")
    .output_stream("sum")
    .node(
      NodeConfig::new("JoinCalculator")
        .named("join")
        .input("LEFT:left")
        .input("RIGHT:right")
        .output("SUM:sum"),
    )
    .build()
}

/// Pushes both timestamp sets, closes the inputs and returns the timestamps
/// the join node ran at together with the sum stream's timestamps.
async fn run_join(left: &BTreeSet<i64>, right: &BTreeSet<i64>) -> Result<(Vec<i64>, Vec<i64>), GraphError> {
  let invocations = Arc::new(Mutex::new(Vec::new()));
  let mut graph = Graph::new(registry_with_join(Arc::clone(&invocations)));
  graph.initialize(join_config())?;
  let poller = graph.add_output_stream_poller("sum")?;
  graph.start_run(HashMap::new())?;

  for t in left {
    graph
      .add_packet_to_input_stream("left", Packet::new(*t, Timestamp::new(*t)))
      .await?;
  }
  for t in right {
    graph
      .add_packet_to_input_stream("right", Packet::new(*t, Timestamp::new(*t)))
      .await?;
  }
  graph.close_all_input_streams()?;
  graph.wait_until_done().await?;

  let sums: Vec<i64> = poller
    .into_stream()
    .map(|packet| packet.timestamp().value())
    .collect()
    .await;
  let invoked = invocations.lock().map(|v| v.clone()).unwrap_or_default();
  Ok((invoked, sums))
}

#[tokio::test]
async fn doubling_graph_delivers_in_order_then_done() {
  let mut graph = Graph::new(registry_with_join(Arc::default()));
  let config = GraphBuilder::new()
    .input_stream("in")
    .output_stream("out")
    .node(NodeConfig::new("DoubleCalculator").input("in").output("out"))
    .build();
  graph.initialize(config).unwrap();

  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = Arc::clone(&seen);
  graph
    .observe_output_stream("out", move |packet| {
      sink
        .lock()
        .unwrap()
        .push((packet.timestamp(), *packet.get::<f64>()?));
      Ok(())
    })
    .unwrap();

  graph.start_run(HashMap::new()).unwrap();
  for (t, value) in [0.0, 0.1, 0.2].into_iter().enumerate() {
    graph
      .add_packet_to_input_stream("in", Packet::new(value, Timestamp::new(t as i64)))
      .await
      .unwrap();
  }
  graph.close_input_stream("in").unwrap();
  graph.wait_until_done().await.unwrap();

  assert_eq!(graph.state(), GraphState::Done);
  assert_eq!(
    *seen.lock().unwrap(),
    vec![
      (Timestamp::new(0), 0.0),
      (Timestamp::new(1), 0.2),
      (Timestamp::new(2), 0.4),
    ]
  );
}

#[tokio::test]
async fn numeric_input_on_text_stream_fails_initialize() {
  let mut graph = Graph::new(registry_with_join(Arc::default()));
  let config = GraphBuilder::new()
    .output_stream("out")
    .node(NodeConfig::new("StringSourceCalculator").output("STR:text"))
    .node(NodeConfig::new("DoubleCalculator").input("text").output("out"))
    .build();

  let err = graph.initialize(config).unwrap_err();
  assert!(matches!(err, GraphError::ContractMismatch { .. }));
  assert!(err.is_build_error());
  assert_eq!(graph.state(), GraphState::Uninitialized);
  assert!(matches!(
    graph.start_run(HashMap::new()),
    Err(GraphError::InvalidState { .. })
  ));
}

#[tokio::test]
async fn join_runs_once_per_common_timestamp() {
  let left: BTreeSet<i64> = [0, 1, 2, 4, 6, 7].into_iter().collect();
  let right: BTreeSet<i64> = [1, 2, 3, 6, 8].into_iter().collect();
  let (invoked, sums) = run_join(&left, &right).await.unwrap();
  assert_eq!(invoked, vec![1, 2, 6]);
  assert_eq!(sums, vec![1, 2, 6]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn join_on_multi_thread_runtime() {
  let left: BTreeSet<i64> = (0..500).filter(|t| t % 2 == 0).collect();
  let right: BTreeSet<i64> = (0..500).filter(|t| t % 3 == 0).collect();
  let (invoked, _) = run_join(&left, &right).await.unwrap();
  let expected: Vec<i64> = (0..500).filter(|t| t % 6 == 0).collect();
  assert_eq!(invoked, expected);
}

#[tokio::test]
async fn source_stopping_after_n_closes_its_stream() {
  let mut graph = Graph::new(NodeRegistry::with_builtins());
  let config = GraphBuilder::new()
    .output_stream("strings")
    .node(
      NodeConfig::new("StringSourceCalculator")
        .output("STR:strings")
        .options(serde_json::json!({ "prefix": "item", "count": 7 })),
    )
    .build();
  graph.initialize(config).unwrap();
  let mut poller = graph.add_output_stream_poller("strings").unwrap();
  graph.start_run(HashMap::new()).unwrap();

  let mut values = Vec::new();
  while let Some(packet) = poller.next().await {
    values.push(packet.get::<String>().unwrap().clone());
  }
  let expected: Vec<String> = (0..7).map(|i| format!("item{i}")).collect();
  assert_eq!(values, expected);
  graph.wait_until_done().await.unwrap();
}

#[tokio::test]
async fn pass_through_round_trip_keeps_value_and_timestamp() {
  let config = GraphConfig::from_json_str(
    r#"{
      "input_streams": ["in"],
      "output_streams": ["out"],
      "nodes": [
        { "calculator": "PassThroughCalculator", "input_streams": ["in"], "output_streams": ["out1"] },
        { "calculator": "PassThroughCalculator", "input_streams": ["out1"], "output_streams": ["out"] }
      ]
    }"#,
  )
  .unwrap();
  let mut graph = Graph::new(NodeRegistry::with_builtins());
  graph.initialize(config).unwrap();
  let mut poller = graph.add_output_stream_poller("out").unwrap();
  graph.start_run(HashMap::new()).unwrap();

  let payload = Arc::new(String::from("frame"));
  graph
    .add_packet_to_input_stream("in", Packet::from_arc(Arc::clone(&payload), Timestamp::new(-3)))
    .await
    .unwrap();
  graph.close_all_input_streams().unwrap();

  let packet = poller.next().await.unwrap();
  assert_eq!(packet.timestamp(), Timestamp::new(-3));
  assert!(Arc::ptr_eq(&packet.share::<String>().unwrap(), &payload));
  assert!(poller.next().await.is_none());
  graph.wait_until_done().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bounded_chain_applies_backpressure_without_loss() {
  let mut builder = GraphBuilder::new()
    .input_stream("in")
    .output_stream("s3")
    .max_queue_size(2);
  let mut previous = "in".to_string();
  for stage in 1..=3 {
    let next = format!("s{stage}");
    builder = builder.node(
      NodeConfig::new("ScaleCalculator")
        .input(previous.clone())
        .output(next.clone())
        .options(serde_json::json!({ "factor": 2.0 })),
    );
    previous = next;
  }
  let mut graph = Graph::new(NodeRegistry::with_builtins());
  graph.initialize(builder.build()).unwrap();
  let poller = graph.add_output_stream_poller("s3").unwrap();
  graph.start_run(HashMap::new()).unwrap();

  let reader = tokio::spawn(async move {
    poller
      .into_stream()
      .map(|packet| *packet.get::<f64>().unwrap())
      .collect::<Vec<f64>>()
      .await
  });
  for t in 0..200 {
    graph
      .add_packet_to_input_stream("in", Packet::new(t as f64, Timestamp::new(t)))
      .await
      .unwrap();
  }
  graph.close_all_input_streams().unwrap();
  graph.wait_until_done().await.unwrap();

  let values = reader.await.unwrap();
  let expected: Vec<f64> = (0..200).map(|t| t as f64 * 8.0).collect();
  assert_eq!(values, expected);
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(32))]

  #[test]
  fn closing_inputs_always_reaches_done(
    left in prop::collection::btree_set(-20i64..60, 0..30),
    right in prop::collection::btree_set(-20i64..60, 0..30),
  ) {
    let runtime = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .unwrap();
    let outcome = runtime.block_on(async {
      tokio::time::timeout(Duration::from_secs(5), run_join(&left, &right)).await
    });
    let (invoked, sums) = outcome.expect("graph run hung").unwrap();
    let expected: Vec<i64> = left.intersection(&right).copied().collect();
    prop_assert_eq!(&invoked, &expected);
    prop_assert_eq!(sums, expected);
  }
}
