//! # Graph
//!
//! This module defines the [`Graph`] struct: it turns a [`GraphConfig`] into
//! wired node instances, validates the wiring, and drives a run.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --initialize--> Built --start_run--> Running --wait_until_done--> Done | Failed
//! ```
//!
//! - [`Graph::initialize`] creates every node through the [`NodeRegistry`] and
//!   validates contracts and wiring. Nothing runs yet.
//! - Between `initialize` and `start_run` the caller attaches observers
//!   ([`Graph::observe_output_stream`]) and pollers
//!   ([`Graph::add_output_stream_poller`]).
//! - [`Graph::start_run`] spawns one Tokio task per node. Source nodes start
//!   producing at once.
//! - The caller feeds graph input streams with
//!   [`Graph::add_packet_to_input_stream`] and closes them with
//!   [`Graph::close_input_stream`] or [`Graph::close_all_input_streams`].
//! - [`Graph::wait_until_done`] resolves once every node has finished. It
//!   reports the first run-time error, if any.
//!
//! Closing the inputs is the only way to end a run: `wait_until_done` does not
//! close anything itself.
//!
//! ## Example
//!
//! ```rust
//! use packetweave::config::NodeConfig;
//! use packetweave::graph::Graph;
//! use packetweave::graph_builder::GraphBuilder;
//! use packetweave::packet::Packet;
//! use packetweave::registry::NodeRegistry;
//! use packetweave::time::Timestamp;
//! use std::collections::HashMap;
//! use std::sync::{Arc, Mutex};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), packetweave::error::GraphError> {
//! let config = GraphBuilder::new()
//!   .input_stream("in")
//!   .output_stream("out")
//!   .node(
//!     NodeConfig::new("ScaleCalculator")
//!       .input("in")
//!       .output("out")
//!       .options(serde_json::json!({ "factor": 2.0 })),
//!   )
//!   .build();
//!
//! let mut graph = Graph::new(NodeRegistry::with_builtins());
//! graph.initialize(config)?;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! graph.observe_output_stream("out", move |packet| {
//!   sink.lock().unwrap().push(*packet.get::<f64>()?);
//!   Ok(())
//! })?;
//!
//! graph.start_run(HashMap::new())?;
//! for i in 0..3 {
//!   graph
//!     .add_packet_to_input_stream("in", Packet::new(i as f64, Timestamp::new(i)))
//!     .await?;
//! }
//! graph.close_all_input_streams()?;
//! graph.wait_until_done().await?;
//!
//! assert_eq!(*seen.lock().unwrap(), vec![0.0, 2.0, 4.0]);
//! # Ok(())
//! # }
//! ```

use crate::channels::{ConsumerQueue, StreamWriter};
use crate::config::{GraphConfig, NodeConfig, parse_stream_refs};
use crate::contract::{PortId, PortSpec, PortType};
use crate::error::GraphError;
use crate::node::{Node, NodeContext, NodeExecutionError};
use crate::output::OutputStreamPoller;
use crate::packet::Packet;
use crate::registry::NodeRegistry;
use crate::scheduler::{InputPort, InputSet, NodeWorker, RunContext, run_node};
use crate::stream::Stream;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Lifecycle state of a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphState {
  /// Created, no config yet.
  Uninitialized,
  /// Config validated, nodes created, not running.
  Built,
  /// Node tasks are running.
  Running,
  /// The run finished without error.
  Done,
  /// The run finished with an error.
  Failed,
}

impl fmt::Display for GraphState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      GraphState::Uninitialized => "uninitialized",
      GraphState::Built => "built",
      GraphState::Running => "running",
      GraphState::Done => "done",
      GraphState::Failed => "failed",
    };
    f.write_str(name)
  }
}

/// Who writes a stream.
enum Producer {
  GraphInput,
  Node { index: usize, port_type: PortType },
}

struct PlannedInput {
  spec: PortSpec,
  /// `None` for an unconnected optional port.
  stream: Option<String>,
}

/// A created, validated node waiting for the run to start.
struct PlannedNode {
  name: String,
  node: Box<dyn Node>,
  is_source: bool,
  inputs: Vec<PlannedInput>,
  outputs: Vec<(PortSpec, String)>,
  /// `(tag, graph side packet name)`.
  side_packets: Vec<(String, String)>,
}

/// Everything `initialize` produces.
struct Plan {
  /// In topological order.
  nodes: Vec<PlannedNode>,
  writers: HashMap<String, StreamWriter>,
  input_streams: Vec<String>,
  side_packet_names: Vec<String>,
  max_queue_size: Option<usize>,
}

/// Handles of a started run.
struct Run {
  context: Arc<RunContext>,
  inputs: HashMap<String, Arc<StreamWriter>>,
  tasks: Vec<(String, JoinHandle<()>)>,
}

/// A dataflow graph of nodes connected by timestamped streams.
///
/// A `Graph` is single-use: after `wait_until_done` it stays `Done` or
/// `Failed`. Create a new one for another run.
pub struct Graph {
  registry: NodeRegistry,
  state: GraphState,
  node_names: Vec<String>,
  plan: Option<Plan>,
  run: Option<Run>,
}

impl Graph {
  /// Creates an empty graph that builds its nodes from `registry`.
  pub fn new(registry: NodeRegistry) -> Self {
    Self {
      registry,
      state: GraphState::Uninitialized,
      node_names: Vec::new(),
      plan: None,
      run: None,
    }
  }

  /// Current lifecycle state.
  pub fn state(&self) -> GraphState {
    self.state
  }

  /// Returns `true` once a run-time error has been recorded.
  pub fn has_error(&self) -> bool {
    self.state == GraphState::Failed
      || self
        .run
        .as_ref()
        .is_some_and(|run| run.context.is_failed())
  }

  /// Node names in scheduling (topological) order. Empty before `initialize`.
  pub fn node_names(&self) -> &[String] {
    &self.node_names
  }

  fn invalid_state(&self, operation: &'static str) -> GraphError {
    GraphError::InvalidState {
      operation,
      state: self.state.to_string(),
    }
  }

  /// Creates and validates every node of `config`.
  ///
  /// # Errors
  ///
  /// - [`GraphError::UnknownCalculator`] / [`GraphError::NodeConstruction`] if
  ///   a node cannot be created
  /// - [`GraphError::ContractMismatch`] for unknown, doubly wired or unwired
  ///   required ports, unwired side packets and type disagreements across an
  ///   edge
  /// - [`GraphError::DuplicateStream`] if two producers write one stream
  /// - [`GraphError::DanglingStream`] if a consumed or exported stream has no
  ///   producer
  /// - [`GraphError::Cycle`] if the node wiring contains a cycle
  /// - [`GraphError::InvalidConfig`] for malformed references or duplicate node
  ///   names
  /// - [`GraphError::InvalidState`] if the graph was already initialized
  pub fn initialize(&mut self, config: GraphConfig) -> Result<(), GraphError> {
    if self.state != GraphState::Uninitialized {
      return Err(self.invalid_state("initialize"));
    }
    debug!(
      nodes = config.nodes.len(),
      inputs = config.input_streams.len(),
      outputs = config.output_streams.len(),
      "initializing graph"
    );
    let plan = plan_graph(&self.registry, &config)?;
    self.node_names = plan.nodes.iter().map(|node| node.name.clone()).collect();
    self.plan = Some(plan);
    self.state = GraphState::Built;
    Ok(())
  }

  fn built_writer(&mut self, name: &str, operation: &'static str) -> Result<&mut StreamWriter, GraphError> {
    if self.state != GraphState::Built {
      return Err(self.invalid_state(operation));
    }
    self
      .plan
      .as_mut()
      .and_then(|plan| plan.writers.get_mut(name))
      .ok_or_else(|| GraphError::UnknownStream {
        stream: name.to_string(),
      })
  }

  /// Registers `observer` for every packet on stream `name`.
  ///
  /// The observer runs on the task that produced the packet, in timestamp
  /// order. Returning an error fails the run with [`GraphError::Observer`].
  ///
  /// # Errors
  ///
  /// [`GraphError::UnknownStream`] if no such stream exists,
  /// [`GraphError::InvalidState`] unless the graph is `Built`.
  pub fn observe_output_stream<F>(&mut self, name: &str, observer: F) -> Result<(), GraphError>
  where
    F: FnMut(&Packet) -> Result<(), NodeExecutionError> + Send + 'static,
  {
    let writer = self.built_writer(name, "observe_output_stream")?;
    writer.add_observer(Box::new(observer));
    debug!(stream = %name, "observer attached");
    Ok(())
  }

  /// Creates a poller that receives every packet on stream `name`.
  ///
  /// Poller queues are unbounded; `max_queue_size` does not apply to them.
  ///
  /// # Errors
  ///
  /// [`GraphError::UnknownStream`] if no such stream exists,
  /// [`GraphError::InvalidState`] unless the graph is `Built`.
  pub fn add_output_stream_poller(&mut self, name: &str) -> Result<OutputStreamPoller, GraphError> {
    let writer = self.built_writer(name, "add_output_stream_poller")?;
    let readable = Arc::new(Notify::new());
    let queue = ConsumerQueue::new(Stream::new(name), PortType::Any, Arc::clone(&readable));
    writer.add_consumer(Arc::clone(&queue));
    debug!(stream = %name, "poller attached");
    Ok(OutputStreamPoller::new(name, queue, readable))
  }

  /// Starts the run: spawns one task per node on the current Tokio runtime.
  ///
  /// `side_packets` maps graph side packet names to their values.
  ///
  /// # Errors
  ///
  /// - [`GraphError::MissingSidePacket`] if a declared or wired side packet is
  ///   not supplied
  /// - [`GraphError::InvalidState`] unless the graph is `Built`, or when called
  ///   outside a Tokio runtime
  pub fn start_run(&mut self, side_packets: HashMap<String, Packet>) -> Result<(), GraphError> {
    if self.state != GraphState::Built {
      return Err(self.invalid_state("start_run"));
    }
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| GraphError::InvalidState {
      operation: "start_run",
      state: "outside a Tokio runtime".to_string(),
    })?;
    if let Some(name) = self
      .plan
      .as_ref()
      .and_then(|plan| missing_side_packet(plan, &side_packets))
    {
      return Err(GraphError::MissingSidePacket { name });
    }
    let Some(plan) = self.plan.take() else {
      return Err(self.invalid_state("start_run"));
    };

    let Plan {
      nodes,
      mut writers,
      input_streams,
      max_queue_size,
      ..
    } = plan;

    // Consumer queues must be attached before the writers are shared.
    let mut wired = Vec::with_capacity(nodes.len());
    for planned in nodes {
      let readable = Arc::new(Notify::new());
      let mut ports = Vec::with_capacity(planned.inputs.len());
      for input in &planned.inputs {
        let queue = match &input.stream {
          Some(stream) => {
            let writer = writers.get_mut(stream).ok_or_else(|| GraphError::UnknownStream {
              stream: stream.clone(),
            })?;
            let buffer = match max_queue_size {
              Some(capacity) => Stream::bounded(stream.clone(), capacity),
              None => Stream::new(stream.clone()),
            };
            let queue = ConsumerQueue::new(buffer, input.spec.port_type, Arc::clone(&readable));
            writer.add_consumer(Arc::clone(&queue));
            Some(queue)
          }
          None => None,
        };
        ports.push(InputPort {
          queue,
          optional: input.spec.optional,
        });
      }
      wired.push((planned, readable, ports));
    }

    let writers: HashMap<String, Arc<StreamWriter>> = writers
      .into_iter()
      .map(|(name, writer)| (name, Arc::new(writer)))
      .collect();
    let inputs: HashMap<String, Arc<StreamWriter>> = input_streams
      .iter()
      .filter_map(|name| writers.get(name).map(|writer| (name.clone(), Arc::clone(writer))))
      .collect();
    let context = Arc::new(RunContext::new(
      writers.values().cloned().collect(),
      inputs.values().cloned().collect(),
    ));

    let mut tasks = Vec::with_capacity(wired.len());
    for (planned, readable, ports) in wired {
      let mut outputs = Vec::with_capacity(planned.outputs.len());
      for (_, stream) in &planned.outputs {
        let writer = writers.get(stream).ok_or_else(|| GraphError::UnknownStream {
          stream: stream.clone(),
        })?;
        outputs.push(Arc::clone(writer));
      }
      let node_side_packets: HashMap<String, Packet> = planned
        .side_packets
        .iter()
        .filter_map(|(tag, name)| side_packets.get(name).map(|packet| (tag.clone(), packet.clone())))
        .collect();
      let context_for_node = NodeContext::new(
        planned.name.clone(),
        planned.inputs.iter().map(|input| input.spec.id.clone()).collect(),
        planned.outputs.iter().map(|(spec, _)| spec.id.clone()).collect(),
        Arc::new(node_side_packets),
      );
      let worker = NodeWorker {
        name: planned.name.clone(),
        node: planned.node,
        context: context_for_node,
        inputs: InputSet::new(planned.name.clone(), ports),
        readable,
        outputs,
        is_source: planned.is_source,
        run: Arc::clone(&context),
      };
      tasks.push((planned.name, runtime.spawn(run_node(worker))));
    }

    debug!(nodes = tasks.len(), "graph run started");
    self.run = Some(Run {
      context,
      inputs,
      tasks,
    });
    self.state = GraphState::Running;
    Ok(())
  }

  fn running(&self, operation: &'static str) -> Result<&Run, GraphError> {
    match (&self.state, &self.run) {
      (GraphState::Running, Some(run)) => Ok(run),
      _ => Err(self.invalid_state(operation)),
    }
  }

  fn input_writer(&self, name: &str, operation: &'static str) -> Result<Arc<StreamWriter>, GraphError> {
    let run = self.running(operation)?;
    run
      .inputs
      .get(name)
      .cloned()
      .ok_or_else(|| GraphError::UnknownStream {
        stream: name.to_string(),
      })
  }

  /// Observer errors belong to the run, not to the caller's push.
  fn settle_push(&self, result: Result<(), GraphError>) -> Result<(), GraphError> {
    match result {
      Err(err @ GraphError::Observer { .. }) => {
        if let Some(run) = &self.run {
          run.context.fail(err);
        }
        Ok(())
      }
      other => other,
    }
  }

  /// Pushes `packet` into graph input stream `name`, waiting for space if the
  /// stream is bounded.
  ///
  /// # Errors
  ///
  /// - [`GraphError::OrderingViolation`] if the timestamp does not increase
  /// - [`GraphError::StreamClosed`] if the stream (or the run) is closed
  /// - [`GraphError::TypeMismatch`] if a consumer declared another type
  /// - [`GraphError::UnknownStream`] / [`GraphError::InvalidState`]
  pub async fn add_packet_to_input_stream(&self, name: &str, packet: Packet) -> Result<(), GraphError> {
    let writer = self.input_writer(name, "add_packet_to_input_stream")?;
    trace!(stream = %name, timestamp = %packet.timestamp(), "input packet");
    let result = writer.write(packet).await;
    self.settle_push(result)
  }

  /// Pushes `packet` into graph input stream `name` without waiting.
  ///
  /// # Errors
  ///
  /// As [`Graph::add_packet_to_input_stream`], plus the retryable
  /// [`GraphError::StreamFull`] when a bounded consumer queue has no room. A
  /// rejected packet is not recorded, so the same timestamp may be retried.
  pub fn add_packet_to_input_stream_if_not_full(&self, name: &str, packet: Packet) -> Result<(), GraphError> {
    let writer = self.input_writer(name, "add_packet_to_input_stream_if_not_full")?;
    let result = writer.try_write(packet);
    self.settle_push(result)
  }

  /// Closes graph input stream `name`. Packets already pushed are still
  /// processed. Closing twice is a no-op.
  ///
  /// # Errors
  ///
  /// [`GraphError::UnknownStream`] / [`GraphError::InvalidState`].
  pub fn close_input_stream(&self, name: &str) -> Result<(), GraphError> {
    let writer = self.input_writer(name, "close_input_stream")?;
    debug!(stream = %name, "closing input stream");
    writer.close();
    Ok(())
  }

  /// Closes every graph input stream.
  ///
  /// # Errors
  ///
  /// [`GraphError::InvalidState`] unless the graph is running.
  pub fn close_all_input_streams(&self) -> Result<(), GraphError> {
    let run = self.running("close_all_input_streams")?;
    debug!("closing all input streams");
    for writer in run.inputs.values() {
      writer.close();
    }
    Ok(())
  }

  /// Closes every graph input stream and stops every source node after its
  /// current call.
  ///
  /// # Errors
  ///
  /// [`GraphError::InvalidState`] unless the graph is running.
  pub fn close_all_packet_sources(&self) -> Result<(), GraphError> {
    let run = self.running("close_all_packet_sources")?;
    run.context.stop_sources();
    Ok(())
  }

  /// Waits for every node task to finish.
  ///
  /// # Errors
  ///
  /// The first run-time error ([`GraphError::NodeProcess`],
  /// [`GraphError::Observer`], or a push error raised while a node emitted),
  /// after which the graph is `Failed`. [`GraphError::InvalidState`] unless
  /// the graph is running.
  pub async fn wait_until_done(&mut self) -> Result<(), GraphError> {
    if self.state != GraphState::Running {
      return Err(self.invalid_state("wait_until_done"));
    }
    let Some(run) = self.run.as_mut() else {
      return Err(GraphError::InvalidState {
        operation: "wait_until_done",
        state: self.state.to_string(),
      });
    };
    for (node, task) in std::mem::take(&mut run.tasks) {
      if let Err(err) = task.await {
        run.context.fail(GraphError::NodeProcess {
          node,
          source: err.to_string().into(),
        });
      }
    }
    match run.context.take_error() {
      Some(err) => {
        self.state = GraphState::Failed;
        debug!(error = %err, "graph run failed");
        Err(err)
      }
      None => {
        self.state = GraphState::Done;
        debug!("graph run done");
        Ok(())
      }
    }
  }
}

impl fmt::Debug for Graph {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Graph")
      .field("state", &self.state)
      .field("nodes", &self.node_names)
      .field("registry", &self.registry)
      .finish()
  }
}

fn missing_side_packet(plan: &Plan, supplied: &HashMap<String, Packet>) -> Option<String> {
  plan
    .side_packet_names
    .iter()
    .chain(plan.nodes.iter().flat_map(|node| node.side_packets.iter().map(|(_, name)| name)))
    .find(|name| !supplied.contains_key(*name))
    .cloned()
}

/// Creates one node and resolves its ports against its contract.
fn plan_node(registry: &NodeRegistry, config: &NodeConfig, position: usize) -> Result<PlannedNode, GraphError> {
  let name = config
    .name
    .clone()
    .unwrap_or_else(|| format!("{}_{}", config.calculator, position));
  let node = registry.create(config)?;
  let contract = node.contract();
  let mismatch = |detail: String| GraphError::ContractMismatch {
    node: name.clone(),
    detail,
  };

  if let Some(port) = contract.duplicate_port() {
    return Err(mismatch(format!("port {} is declared twice", port)));
  }

  let mut input_streams: Vec<Option<String>> = vec![None; contract.inputs().len()];
  for stream_ref in parse_stream_refs(&config.input_streams)? {
    let slot = contract
      .inputs()
      .iter()
      .position(|spec| spec.id == stream_ref.port)
      .ok_or_else(|| mismatch(format!("no input port {}", stream_ref.port)))?;
    if input_streams[slot].replace(stream_ref.name).is_some() {
      return Err(mismatch(format!("input port {} is wired twice", stream_ref.port)));
    }
  }

  let mut output_streams: Vec<Option<String>> = vec![None; contract.outputs().len()];
  for stream_ref in parse_stream_refs(&config.output_streams)? {
    let slot = contract
      .outputs()
      .iter()
      .position(|spec| spec.id == stream_ref.port)
      .ok_or_else(|| mismatch(format!("no output port {}", stream_ref.port)))?;
    if output_streams[slot].replace(stream_ref.name).is_some() {
      return Err(mismatch(format!("output port {} is wired twice", stream_ref.port)));
    }
  }

  let mut inputs = Vec::with_capacity(input_streams.len());
  for (spec, stream) in contract.inputs().iter().zip(input_streams) {
    if stream.is_none() && !spec.optional {
      return Err(mismatch(format!("required input port {} is not connected", spec.id)));
    }
    inputs.push(PlannedInput {
      spec: spec.clone(),
      stream,
    });
  }

  // Unwired outputs still get a private stream so the node can emit freely.
  let outputs = contract
    .outputs()
    .iter()
    .zip(output_streams)
    .map(|(spec, stream)| {
      let stream = stream.unwrap_or_else(|| format!("{}:{}", name, spec.id));
      (spec.clone(), stream)
    })
    .collect();

  let mut side_packets = Vec::new();
  for stream_ref in parse_stream_refs(&config.input_side_packets)? {
    let tag = match stream_ref.port {
      PortId::Tag(tag, _) => tag,
      PortId::Index(_) => stream_ref.name.clone(),
    };
    side_packets.push((tag, stream_ref.name));
  }
  for tag in contract.side_packets() {
    if !side_packets.iter().any(|(wired, _)| wired == tag) {
      return Err(mismatch(format!("side packet {} is not connected", tag)));
    }
  }

  debug!(node = %name, calculator = %config.calculator, "node created");
  Ok(PlannedNode {
    is_source: contract.is_source(),
    name,
    node,
    inputs,
    outputs,
    side_packets,
  })
}

/// Builds and validates the whole graph.
fn plan_graph(registry: &NodeRegistry, config: &GraphConfig) -> Result<Plan, GraphError> {
  let mut producers: HashMap<String, Producer> = HashMap::new();
  for stream in &config.input_streams {
    if producers.insert(stream.clone(), Producer::GraphInput).is_some() {
      return Err(GraphError::DuplicateStream {
        stream: stream.clone(),
      });
    }
  }

  let mut names = HashSet::new();
  let mut nodes: Vec<PlannedNode> = Vec::with_capacity(config.nodes.len());
  for (position, node_config) in config.nodes.iter().enumerate() {
    let planned = plan_node(registry, node_config, position)?;
    if !names.insert(planned.name.clone()) {
      return Err(GraphError::InvalidConfig(format!(
        "duplicate node name '{}'",
        planned.name
      )));
    }
    for (spec, stream) in &planned.outputs {
      let producer = Producer::Node {
        index: nodes.len(),
        port_type: spec.port_type,
      };
      if producers.insert(stream.clone(), producer).is_some() {
        return Err(GraphError::DuplicateStream {
          stream: stream.clone(),
        });
      }
    }
    nodes.push(planned);
  }

  let mut edges = Vec::new();
  let mut input_types: HashMap<String, PortType> = HashMap::new();
  for (index, planned) in nodes.iter().enumerate() {
    for input in &planned.inputs {
      let Some(stream) = &input.stream else {
        continue;
      };
      let produced = match producers.get(stream) {
        None => {
          return Err(GraphError::DanglingStream {
            stream: stream.clone(),
            consumer: planned.name.clone(),
          });
        }
        Some(Producer::Node { index: source, port_type }) => {
          edges.push((*source, index));
          *port_type
        }
        Some(Producer::GraphInput) => {
          // A graph input takes the first concrete type a consumer declares.
          let resolved = input_types.entry(stream.clone()).or_insert(PortType::Any);
          if *resolved == PortType::Any {
            *resolved = input.spec.port_type;
          }
          *resolved
        }
      };
      if !produced.compatible_with(&input.spec.port_type) {
        return Err(GraphError::ContractMismatch {
          node: planned.name.clone(),
          detail: format!(
            "input {} expects {} but stream '{}' carries {}",
            input.spec.id,
            input.spec.port_type.name(),
            stream,
            produced.name()
          ),
        });
      }
    }
  }

  for stream in &config.output_streams {
    if !producers.contains_key(stream) {
      return Err(GraphError::DanglingStream {
        stream: stream.clone(),
        consumer: "graph output".to_string(),
      });
    }
  }

  let node_names: Vec<String> = nodes.iter().map(|node| node.name.clone()).collect();
  let order = topological_sort(&node_names, &edges)?;

  let mut writers = HashMap::new();
  for stream in &config.input_streams {
    let port_type = input_types.get(stream).copied().unwrap_or(PortType::Any);
    writers.insert(stream.clone(), StreamWriter::new(stream.clone(), port_type));
  }
  for planned in &nodes {
    for (spec, stream) in &planned.outputs {
      writers.insert(stream.clone(), StreamWriter::new(stream.clone(), spec.port_type));
    }
  }

  let mut slots: Vec<Option<PlannedNode>> = nodes.into_iter().map(Some).collect();
  let nodes = order
    .into_iter()
    .filter_map(|index| slots[index].take())
    .collect();

  Ok(Plan {
    nodes,
    writers,
    input_streams: config.input_streams.clone(),
    side_packet_names: config.input_side_packets.clone(),
    max_queue_size: config.max_queue_size,
  })
}

/// Orders nodes so every producer precedes its consumers (Kahn's algorithm).
///
/// `edges` are `(producer, consumer)` index pairs into `names`.
///
/// # Errors
///
/// [`GraphError::Cycle`] naming every node that is on, or downstream of, a
/// cycle.
pub(crate) fn topological_sort(names: &[String], edges: &[(usize, usize)]) -> Result<Vec<usize>, GraphError> {
  let mut in_degree = vec![0usize; names.len()];
  let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
  for &(source, target) in edges {
    adjacency[source].push(target);
    in_degree[target] += 1;
  }

  let mut queue: VecDeque<usize> = (0..names.len()).filter(|&node| in_degree[node] == 0).collect();
  let mut order = Vec::with_capacity(names.len());
  while let Some(node) = queue.pop_front() {
    order.push(node);
    for &neighbor in &adjacency[node] {
      in_degree[neighbor] -= 1;
      if in_degree[neighbor] == 0 {
        queue.push_back(neighbor);
      }
    }
  }

  if order.len() != names.len() {
    let nodes = (0..names.len())
      .filter(|&node| in_degree[node] > 0)
      .map(|node| names[node].clone())
      .collect();
    return Err(GraphError::Cycle { nodes });
  }
  Ok(order)
}
