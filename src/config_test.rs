//! # Config Test Suite
//!
//! Covers JSON loading of [`GraphConfig`], node option helpers and stream
//! reference parsing.

use crate::config::{GraphConfig, NodeConfig, StreamRef, parse_stream_refs};
use crate::contract::PortId;
use crate::error::GraphError;
use serde_json::json;
use std::io::Write;

const TWO_PASS_THROUGH: &str = r#"{
  "input_streams": ["in"],
  "output_streams": ["out"],
  "nodes": [
    { "calculator": "PassThroughCalculator", "input_streams": ["in"], "output_streams": ["out1"] },
    { "calculator": "PassThroughCalculator", "input_streams": ["out1"], "output_streams": ["out"] }
  ]
}"#;

fn refs(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_from_json_str() {
  let config = GraphConfig::from_json_str(TWO_PASS_THROUGH).unwrap();
  assert_eq!(config.input_streams, vec!["in"]);
  assert_eq!(config.output_streams, vec!["out"]);
  assert_eq!(config.nodes.len(), 2);
  assert_eq!(config.nodes[1].input_streams, vec!["out1"]);
  assert_eq!(config.max_queue_size, None);
  assert!(config.nodes[0].options.is_null());
}

#[test]
fn test_from_json_str_rejects_garbage() {
  let err = GraphConfig::from_json_str("{ nodes: ").unwrap_err();
  assert!(matches!(err, GraphError::InvalidConfig(_)));
}

#[test]
fn test_from_json_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  file.write_all(TWO_PASS_THROUGH.as_bytes()).unwrap();
  let config = GraphConfig::from_json_file(file.path()).unwrap();
  assert_eq!(config.nodes.len(), 2);
}

#[test]
fn test_from_missing_file() {
  let dir = tempfile::tempdir().unwrap();
  let err = GraphConfig::from_json_file(dir.path().join("missing.json")).unwrap_err();
  match err {
    GraphError::InvalidConfig(message) => assert!(message.contains("missing.json")),
    other => panic!("unexpected error: {other}"),
  }
}

#[test]
fn test_json_round_trip_keeps_options() {
  let config = GraphConfig {
    input_streams: vec!["in".to_string()],
    max_queue_size: Some(8),
    nodes: vec![
      NodeConfig::new("ScaleCalculator")
        .named("scale")
        .input("in")
        .output("out")
        .options(json!({ "factor": 2.5 })),
    ],
    ..GraphConfig::default()
  };
  let text = config.to_json_string().unwrap();
  assert_eq!(GraphConfig::from_json_str(&text).unwrap(), config);
}

#[test]
fn test_option_helpers() {
  let node = NodeConfig::new("X").options(json!({ "factor": 0.5, "count": 3, "prefix": "frame" }));
  assert_eq!(node.f64_option("factor", 1.0), 0.5);
  assert_eq!(node.f64_option("missing", 1.0), 1.0);
  assert_eq!(node.u64_option("count", 10), 3);
  assert_eq!(node.u64_option("factor", 10), 10);
  assert_eq!(node.str_option("prefix", "packet"), "frame");
  assert_eq!(NodeConfig::new("X").str_option("prefix", "packet"), "packet");
}

#[test]
fn test_positional_counts() {
  let node = NodeConfig::new("X")
    .input("a")
    .input("TAG:b")
    .input("c")
    .output("VIDEO:1:d");
  assert_eq!(node.positional_inputs(), 2);
  assert_eq!(node.positional_outputs(), 0);
}

#[test]
fn test_parse_stream_refs_forms() {
  let parsed = parse_stream_refs(&refs(&["a", "STR:b", "b", "VIDEO:2:c"])).unwrap();
  assert_eq!(
    parsed,
    vec![
      StreamRef {
        port: PortId::Index(0),
        name: "a".to_string()
      },
      StreamRef {
        port: PortId::tag("STR"),
        name: "b".to_string()
      },
      StreamRef {
        port: PortId::Index(1),
        name: "b".to_string()
      },
      StreamRef {
        port: PortId::from(("VIDEO", 2)),
        name: "c".to_string()
      },
    ]
  );
}

#[test]
fn test_parse_stream_refs_errors() {
  for bad in ["lower:x", "TAG:", ":x", "TAG:z:x", "A:1:2:x", ""] {
    let result = parse_stream_refs(&refs(&[bad]));
    assert!(
      matches!(result, Err(GraphError::InvalidConfig(_))),
      "'{bad}' should be rejected"
    );
  }
}
