use chrono::{DateTime, TimeZone, Utc};
use pipecore::{FlowError, GraphError, NodeError, NodeSpec, PipelineSpec, Value};
use pipenodes::{
    register_all, CollectSink, DebugSink, IntervalSource, IterSource, MapNode, ScaleNode,
    Splitter, WindowSum,
};
use piperuntime::{NodeRegistry, Pipeline, PipelineConfig};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Initialize tracing for tests
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn routing(table: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
    table
        .iter()
        .map(|(input, outputs)| (input.to_string(), names(outputs)))
        .collect()
}

fn standard_registry() -> Arc<NodeRegistry> {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry);
    Arc::new(registry)
}

#[test]
fn test_scale_chain_records_doubled_values() -> anyhow::Result<()> {
    init_tracing();
    let sink = CollectSink::new();
    let collected = sink.handle();
    let mut pipeline = Pipeline::new();
    pipeline
        .add_source("g", IterSource::new([1, 2, 3]))?
        .add_pipe("double", ScaleNode::new(2.0))?
        .add_sink("p", sink)?;
    pipeline
        .connect_default("g", "double")?
        .connect_default("double", "p")?;

    pipeline.run_rounds(3, |_| {})?;
    assert_eq!(
        collected.values(),
        vec![Value::from(2), Value::from(4), Value::from(6)]
    );
    Ok(())
}

#[test]
fn test_iter_source_emits_one_item_per_round() -> anyhow::Result<()> {
    let sink = CollectSink::new();
    let collected = sink.handle();
    let mut pipeline = Pipeline::new();
    pipeline
        .add_source("g", IterSource::new(["a", "b"]))?
        .add_sink("p", sink)?;
    pipeline.connect_default("g", "p")?;

    let stats = pipeline.run_round(|_| {})?;
    assert_eq!(stats.pumped, 1);
    assert_eq!(collected.values(), vec![Value::from("a")]);

    pipeline.run_rounds(3, |_| {})?;
    assert_eq!(collected.values(), vec![Value::from("a"), Value::from("b")]);
    Ok(())
}

#[test]
fn test_splitter_copies_only_to_routed_outputs() -> anyhow::Result<()> {
    let splitter = Splitter::new(
        names(&["A", "B"]),
        names(&["X", "Y", "Z"]),
        routing(&[("A", &["X", "Y"]), ("B", &["Z"])]),
    )?;
    let sink = CollectSink::with_inputs(&["x", "y", "z"]);
    let collected = sink.handle();

    let mut pipeline = Pipeline::new();
    pipeline
        .add_source("g", IterSource::new(["payload"]))?
        .add_pipe("split", splitter)?
        .add_sink("sink", sink)?;
    pipeline
        .connect("g", "default", "split", "A")?
        .connect("split", "X", "sink", "x")?
        .connect("split", "Y", "sink", "y")?
        .connect("split", "Z", "sink", "z")?;

    pipeline.run_rounds(2, |_| {})?;

    assert_eq!(collected.on_port("x"), vec![Value::from("payload")]);
    assert_eq!(collected.on_port("y"), vec![Value::from("payload")]);
    assert!(collected.on_port("z").is_empty());
    // copies are emitted in table order
    let ports: Vec<String> = collected.entries().into_iter().map(|(p, _)| p).collect();
    assert_eq!(ports, vec!["x", "y"]);
    Ok(())
}

#[test]
fn test_splitter_fan_out_to_separate_sinks() -> anyhow::Result<()> {
    let x = CollectSink::new();
    let y = CollectSink::new();
    let (seen_x, seen_y) = (x.handle(), y.handle());

    let mut pipeline = Pipeline::new();
    pipeline
        .add_source("g", IterSource::new([10, 20]))?
        .add_pipe("split", Splitter::fan_out(&["X", "Y"])?)?
        .add_sink("x", x)?
        .add_sink("y", y)?;
    pipeline
        .connect_default("g", "split")?
        .connect("split", "X", "x", "default")?
        .connect("split", "Y", "y", "default")?;

    pipeline.run_rounds(2, |_| {})?;
    assert_eq!(seen_x.values(), vec![Value::from(10), Value::from(20)]);
    assert_eq!(seen_y.values(), vec![Value::from(10), Value::from(20)]);
    Ok(())
}

#[test]
fn test_splitter_rejects_invalid_routing() {
    let err = Splitter::new(
        names(&["A"]),
        names(&["X"]),
        routing(&[("Q", &["X"])]),
    )
    .unwrap_err();
    assert!(matches!(err, GraphError::InvalidRouting(ref msg) if msg.contains('Q')));

    let err = Splitter::new(
        names(&["A"]),
        names(&["X"]),
        routing(&[("A", &["X", "W"])]),
    )
    .unwrap_err();
    assert!(matches!(err, GraphError::InvalidRouting(ref msg) if msg.contains('W')));
}

#[test]
fn test_splitter_unrouted_input_halts() -> anyhow::Result<()> {
    let splitter = Splitter::new(
        names(&["A", "B"]),
        names(&["X"]),
        routing(&[("A", &["X"])]),
    )?;
    let mut pipeline = Pipeline::new();
    pipeline
        .add_source("g", IterSource::new([1]))?
        .add_pipe("split", splitter)?;
    pipeline.connect("g", "default", "split", "B")?;

    let err = pipeline.run_round(|_| {}).unwrap_err();
    assert!(matches!(
        err,
        FlowError::Node { source: NodeError::MissingRoute(ref port), .. } if port == "B"
    ));
    Ok(())
}

#[test]
fn test_map_node_transforms_and_fails() -> anyhow::Result<()> {
    let sink = CollectSink::new();
    let collected = sink.handle();
    let mut pipeline = Pipeline::new();
    pipeline
        .add_source("g", IterSource::new(["ab", "", "cd"]))?
        .add_pipe(
            "upper",
            MapNode::new(|v| match v.as_str() {
                Some("") => Err(NodeError::ExecutionFailed("empty".to_string())),
                Some(s) => Ok(Value::from(s.to_uppercase())),
                None => Ok(v),
            }),
        )?
        .add_sink("p", sink)?;
    pipeline
        .connect_default("g", "upper")?
        .connect_default("upper", "p")?;

    pipeline.run_round(|_| {})?;
    assert_eq!(collected.values(), vec![Value::from("AB")]);
    assert!(pipeline.run_round(|_| {}).is_err());
    Ok(())
}

#[test]
fn test_window_sum_drops_expired_entries() -> anyhow::Result<()> {
    let base: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let now = Arc::new(Mutex::new(base));
    let clock = now.clone();
    let window = WindowSum::with_clock("amount", Duration::from_secs(60), move || {
        *clock.lock().unwrap()
    });

    let deposit = |secs: i64, amount: i64| {
        Value::from(json!({
            "time": (base + chrono::Duration::seconds(secs)).to_rfc3339(),
            "amount": amount,
        }))
    };

    let sink = CollectSink::new();
    let collected = sink.handle();
    let mut pipeline = Pipeline::new();
    pipeline
        .add_source("g", IterSource::new([deposit(0, 5), deposit(30, 7), deposit(90, 1)]))?
        .add_pipe("sum", window)?
        .add_sink("p", sink)?;
    pipeline.connect_default("g", "sum")?.connect_default("sum", "p")?;

    pipeline.run_round(|_| {})?;
    *now.lock().unwrap() = base + chrono::Duration::seconds(30);
    pipeline.run_round(|_| {})?;
    *now.lock().unwrap() = base + chrono::Duration::seconds(90);
    pipeline.run_round(|_| {})?;

    let sums: Vec<f64> = collected
        .values()
        .iter()
        .map(|v| v.get("amount").and_then(|a| a.as_f64()).unwrap())
        .collect();
    assert_eq!(sums, vec![5.0, 12.0, 8.0]);
    Ok(())
}

#[test]
fn test_window_sum_requires_numeric_field() -> anyhow::Result<()> {
    let mut pipeline = Pipeline::new();
    pipeline
        .add_source("g", IterSource::new([Value::from(json!({"total": 3}))]))?
        .add_pipe("sum", WindowSum::new("amount", Duration::from_secs(60)))?;
    pipeline.connect_default("g", "sum")?;

    let err = pipeline.run_round(|_| {}).unwrap_err();
    assert!(matches!(
        err,
        FlowError::Node { source: NodeError::InvalidInputType { ref actual, .. }, .. } if actual == "missing"
    ));
    Ok(())
}

#[test]
fn test_interval_source_ticks_after_interval() -> anyhow::Result<()> {
    let base: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let now = Arc::new(Mutex::new(base));
    let clock = now.clone();
    let advance = |ms: i64| {
        let mut t = now.lock().unwrap();
        *t += chrono::Duration::milliseconds(ms);
    };

    let sink = CollectSink::new();
    let collected = sink.handle();
    let mut pipeline = Pipeline::new();
    pipeline
        .add_source(
            "tick",
            IntervalSource::with_clock(Duration::from_millis(50), move || *clock.lock().unwrap()),
        )?
        .add_sink("p", sink)?;
    pipeline.connect_default("tick", "p")?;

    pipeline.run_round(|_| {})?;
    advance(49);
    pipeline.run_round(|_| {})?;
    assert!(collected.is_empty());

    advance(1);
    pipeline.run_round(|_| {})?;
    // due again, but the last tick moved the reference point
    advance(30);
    pipeline.run_round(|_| {})?;
    let ticks = collected.values();
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0].get("count").and_then(|c| c.as_f64()), Some(1.0));
    assert_eq!(
        ticks[0].get("time").and_then(|t| t.as_str().map(str::to_string)),
        Some((base + chrono::Duration::milliseconds(50)).to_rfc3339())
    );

    advance(20);
    pipeline.run_round(|_| {})?;
    assert_eq!(collected.len(), 2);
    Ok(())
}

#[test]
fn test_register_all_lists_builtin_types() {
    let registry = standard_registry();
    assert_eq!(
        registry.list_node_types(),
        vec![
            "aggregate.window_sum",
            "debug.log",
            "flow.splitter",
            "source.iter",
            "time.interval",
            "transform.scale",
        ]
    );
}

#[test]
fn test_declarative_splitter_pipeline() -> anyhow::Result<()> {
    init_tracing();
    let spec: PipelineSpec = serde_json::from_value(json!({
        "name": "split-and-scale",
        "nodes": [
            {"name": "g", "node_type": "source.iter",
             "config": {"items": {"type": "Json", "value": [1, 2]}}},
            {"name": "split", "node_type": "flow.splitter",
             "config": {
                 "outputs": {"type": "Json", "value": ["fast", "slow"]},
                 "routing": {"type": "Json", "value": {"default": ["fast", "slow"]}}
             }},
            {"name": "triple", "node_type": "transform.scale",
             "config": {"factor": {"type": "Number", "value": 3.0}}},
            {"name": "log", "node_type": "debug.log"}
        ],
        "connections": [
            {"from_node": "g", "to_node": "split"},
            {"from_node": "split", "from_port": "fast", "to_node": "log"},
            {"from_node": "split", "from_port": "slow", "to_node": "triple"},
            {"from_node": "triple", "to_node": "log"}
        ]
    }))?;

    let mut pipeline = Pipeline::from_spec(&spec, standard_registry(), PipelineConfig::default())?;
    assert_eq!(pipeline.output_port_names("split")?, vec!["fast", "slow"]);
    let summary = pipeline.run_rounds(2, |_| {})?;
    // per item: split, log(fast), triple, log(slow)
    assert_eq!(summary.delivered, 8);
    Ok(())
}

#[test]
fn test_factory_configuration_errors() {
    let registry = standard_registry();
    let build = |node_type: &str, config: serde_json::Value| {
        let mut spec = PipelineSpec::new("bad");
        let mut node = NodeSpec::new("n", node_type);
        node.config = serde_json::from_value(config).unwrap();
        spec.add_node(node);
        Pipeline::from_spec(&spec, registry.clone(), PipelineConfig::default()).err()
    };

    assert!(matches!(
        build("flow.splitter", json!({})),
        Some(FlowError::Node { source: NodeError::Configuration(_), .. })
    ));
    assert!(matches!(
        build("flow.splitter", json!({
            "routing": {"type": "Json", "value": {"default": ["nowhere"]}}
        })),
        Some(FlowError::Node { source: NodeError::Graph(GraphError::InvalidRouting(_)), .. })
    ));
    assert!(matches!(
        build("time.interval", json!({"interval_ms": {"type": "Number", "value": 0.0}})),
        Some(FlowError::Node { source: NodeError::Configuration(_), .. })
    ));
    assert!(matches!(
        build("source.iter", json!({})),
        Some(FlowError::Node { source: NodeError::Configuration(_), .. })
    ));
}

#[test]
fn test_debug_sink_accepts_anything() -> anyhow::Result<()> {
    init_tracing();
    let mut pipeline = Pipeline::new();
    pipeline
        .add_source("g", IterSource::new([Value::Null, Value::from(true)]))?
        .add_sink("log", DebugSink::new("test"))?;
    pipeline.connect_default("g", "log")?;
    let summary = pipeline.run_rounds(2, |_| {})?;
    assert_eq!(summary.delivered, 2);
    Ok(())
}
