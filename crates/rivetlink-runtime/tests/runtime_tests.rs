//! Tests for rivetlink-runtime: input/output resolution, loading, hot reload,
//! and end-to-end graph runs against a scripted engine.

use rivetlink_core::*;
use rivetlink_runtime::*;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const MAIN_PROJECT: &str = r#"
version: 4
data:
  metadata: { id: p1, title: Demo }
  graphs:
    g_main:
      metadata: { id: g_main, name: Main }
      nodes:
        '[in_text]:graphInput "Input"':
          data: { id: text, dataType: string }
        '[out_result]:graphOutput "Output"':
          data: { id: result, dataType: string }
"#;

const OTHER_PROJECT: &str = r#"
graphs:
  g_other:
    metadata: { name: Other }
    nodes:
      - { id: in_a, type: graphInput, data: { id: a } }
      - { id: in_b, type: graphInput, data: { id: b } }
      - { id: in_c, type: graphInput, data: { id: c } }
"#;

// ============================================================
// Test doubles
// ============================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Get(String),
    Update(String, Value),
}

/// Host that records every call in order.
#[derive(Default)]
struct RecordingHost {
    values: MemoryHost,
    calls: Mutex<Vec<Call>>,
    reject_updates_for: Option<String>,
}

impl RecordingHost {
    fn with(values: Vec<(&str, Value)>) -> Self {
        Self {
            values: MemoryHost::with_values(values),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn updates(&self) -> Vec<(String, Value)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(k, v) => Some((k, v)),
                Call::Get(_) => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl HostApi for RecordingHost {
    async fn get(&self, key: &str) -> HostResult<Option<Value>> {
        self.calls.lock().unwrap().push(Call::Get(key.to_string()));
        self.values.get(key).await
    }

    async fn update(&self, key: &str, value: Value) -> HostResult<()> {
        self.calls.lock().unwrap().push(Call::Update(key.to_string(), value.clone()));
        if self.reject_updates_for.as_deref() == Some(key) {
            return Err(HostError::rejected(key, "read-only"));
        }
        self.values.update(key, value).await
    }
}

/// Engine that parses real documents and returns a scripted result.
struct ScriptedEngine {
    result: Mutex<Option<EngineResult<ResultMap>>>,
    seen: Mutex<Vec<ProcessorOptions>>,
}

impl ScriptedEngine {
    fn returning(result: Vec<(&str, TaggedValue)>) -> Arc<Self> {
        let map = result.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        Arc::new(Self {
            result: Mutex::new(Some(Ok(map))),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(Err(EngineError::Processor(message.into())))),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<ProcessorOptions> {
        self.seen.lock().unwrap().clone()
    }
}

impl ProjectParser for ScriptedEngine {
    fn parse_project(&self, text: &str) -> EngineResult<Project> {
        DocumentParser.parse_project(text)
    }
}

struct ScriptedProcessor {
    result: EngineResult<ResultMap>,
}

#[async_trait::async_trait]
impl GraphProcessor for ScriptedProcessor {
    async fn run(self: Box<Self>) -> EngineResult<ResultMap> {
        self.result
    }
}

impl GraphEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn create_processor(
        &self,
        project: Arc<Project>,
        options: ProcessorOptions,
    ) -> EngineResult<Box<dyn GraphProcessor>> {
        if !project.graphs.values().any(|g| g.display_name() == options.graph) {
            return Err(EngineError::UnknownGraph(options.graph));
        }
        self.seen.lock().unwrap().push(options);
        let result = self
            .result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(EngineError::Processor("processor reused".into())));
        Ok(Box::new(ScriptedProcessor { result }))
    }
}

fn write_project(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("project.rivet-project");
    std::fs::write(&path, contents).unwrap();
    path
}

fn config_for(path: &Path) -> AdapterConfig {
    let mut config = AdapterConfig::new(path);
    config.watch.enabled = false;
    config
}

async fn loaded_adapter(engine: Arc<ScriptedEngine>) -> (RivetAdapter, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = write_project(&dir, MAIN_PROJECT);
    let adapter = RivetAdapter::new(config_for(&path), engine);
    adapter.reload().await.unwrap();
    (adapter, dir)
}

// ============================================================
// Input resolution
// ============================================================

fn graph_with_inputs(slots: &[&str]) -> GraphData {
    GraphData {
        inputs: slots.iter().map(|s| (s.to_string(), format!("node_{}", s))).collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn inputs_fetched_sequentially_in_declaration_order() {
    let host = RecordingHost::with(vec![("b", json!("two")), ("a", json!(1))]);
    let graph = graph_with_inputs(&["a", "b", "c"]);
    let inputs = resolve_inputs(&graph, &host, false).await.unwrap();

    assert_eq!(
        host.calls(),
        vec![Call::Get("a".into()), Call::Get("b".into()), Call::Get("c".into())]
    );
    assert_eq!(inputs.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn missing_and_null_inputs_default_to_empty_string() {
    let host = RecordingHost::with(vec![("present", json!("x")), ("nulled", Value::Null)]);
    let graph = graph_with_inputs(&["present", "nulled", "absent"]);
    let inputs = resolve_inputs(&graph, &host, true).await.unwrap();

    assert_eq!(inputs.len(), 3);
    assert_eq!(inputs["nulled"], TaggedValue::string(""));
    assert_eq!(inputs["absent"], TaggedValue::string(""));
    assert_eq!(inputs["present"], TaggedValue::string("x"));
}

#[tokio::test]
async fn missing_input_without_verbose_still_defaults() {
    let host = RecordingHost::default();
    let inputs = resolve_inputs(&graph_with_inputs(&["absent"]), &host, false)
        .await
        .unwrap();
    assert_eq!(inputs["absent"], TaggedValue::string(""));
}

#[tokio::test]
async fn non_string_inputs_tagged_any() {
    let host = RecordingHost::with(vec![
        ("n", json!(42)),
        ("o", json!({"k": true})),
        ("f", json!(false)),
    ]);
    let graph = graph_with_inputs(&["n", "o", "f"]);
    let inputs = resolve_inputs(&graph, &host, false).await.unwrap();

    for slot in ["n", "o", "f"] {
        assert_eq!(inputs[slot].data_type, DataType::Any, "slot {}", slot);
    }
    assert_eq!(inputs["n"].value, json!(42));
    assert_eq!(inputs["f"].value, json!(false));
}

// ============================================================
// Publishing
// ============================================================

#[tokio::test]
async fn publish_is_sequential_and_survives_rejections() {
    let host = RecordingHost {
        reject_updates_for: Some("b".into()),
        ..Default::default()
    };
    let outputs: OutputMap = [("a", json!(1)), ("b", json!(2)), ("c", json!(3))]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    let published = publish_outputs(&outputs, &host, false).await;

    assert_eq!(published, 2);
    let keys: Vec<_> = host.updates().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
    assert_eq!(host.values.value("c"), Some(json!(3)));
    assert_eq!(host.values.value("b"), None);
}

// ============================================================
// Loading
// ============================================================

#[tokio::test]
async fn loader_swaps_on_success_and_keeps_stale_on_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_project(&dir, MAIN_PROJECT);
    let store = ProjectStore::new();
    let loader = ProjectLoader::new(&path, Arc::new(DocumentParser), store.clone());

    assert!(!store.is_loaded());
    let first = loader.reload().await.unwrap();
    assert!(Arc::ptr_eq(&first, &store.current().unwrap()));

    std::fs::write(&path, "graphs: [this is: not valid").unwrap();
    let err = loader.reload().await.unwrap_err();
    assert!(matches!(err, LoadError::Parse(EngineError::Parse(_))));
    assert!(Arc::ptr_eq(&first, &store.current().unwrap()));

    std::fs::remove_file(&path).unwrap();
    assert!(matches!(loader.reload().await, Err(LoadError::Io { .. })));
    assert!(Arc::ptr_eq(&first, &store.current().unwrap()));
}

#[tokio::test]
async fn snapshot_survives_reload() {
    let dir = TempDir::new().unwrap();
    let path = write_project(&dir, MAIN_PROJECT);
    let store = ProjectStore::new();
    let loader = ProjectLoader::new(&path, Arc::new(DocumentParser), store.clone());
    loader.reload().await.unwrap();

    let snapshot = store.current().unwrap();
    std::fs::write(&path, OTHER_PROJECT).unwrap();
    loader.reload().await.unwrap();

    assert!(extract_graph_data(&snapshot).contains_key("Main"));
    assert!(extract_graph_data(&store.current().unwrap()).contains_key("Other"));
}

// ============================================================
// Graph runs
// ============================================================

#[tokio::test]
async fn scenario_a_publishes_result_once_and_drops_cost() {
    let engine = ScriptedEngine::returning(vec![
        ("result", TaggedValue::string("HELLO")),
        ("cost", TaggedValue::new(DataType::Any, json!(0.01))),
    ]);
    let (adapter, _dir) = loaded_adapter(engine.clone()).await;
    let host = RecordingHost::with(vec![("text", json!("hello"))]);

    let outputs = adapter.run_graph(&host, "Main").await.unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs["result"], json!("HELLO"));
    assert_eq!(host.updates(), vec![("result".to_string(), json!("HELLO"))]);

    let seen = engine.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].graph, "Main");
    assert_eq!(seen[0].inputs["text"], TaggedValue::string("hello"));
}

#[tokio::test]
async fn scenario_b_undefined_input_sent_as_empty_string() {
    let engine = ScriptedEngine::returning(vec![("result", TaggedValue::string(""))]);
    let (adapter, _dir) = loaded_adapter(engine.clone()).await;
    let host = RecordingHost::default();

    adapter.run_graph(&host, "Main").await.unwrap();

    let seen = engine.seen();
    assert_eq!(seen[0].inputs.len(), 1);
    assert_eq!(
        serde_json::to_value(&seen[0].inputs["text"]).unwrap(),
        json!({"type": "string", "value": ""})
    );
}

#[tokio::test]
async fn scenario_c_json_output_is_merged() {
    let engine =
        ScriptedEngine::returning(vec![("json", TaggedValue::string(r#"{"a":1,"b":2}"#))]);
    let (adapter, _dir) = loaded_adapter(engine).await;
    let host = RecordingHost::default();

    let outputs = adapter.run_graph(&host, "Main").await.unwrap();

    assert_eq!(serde_json::to_value(&outputs).unwrap(), json!({"a": 1, "b": 2}));
    assert_eq!(
        host.updates(),
        vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
    );
}

#[tokio::test]
async fn scenario_d_invalid_json_output_yields_empty_map() {
    let engine =
        ScriptedEngine::returning(vec![("json", TaggedValue::string("not valid json"))]);
    let (adapter, _dir) = loaded_adapter(engine).await;
    let host = RecordingHost::default();

    let outputs = adapter.run_graph(&host, "Main").await.unwrap();

    assert!(outputs.is_empty());
    assert!(host.updates().is_empty());
}

#[tokio::test]
async fn scenario_e_unknown_graph_makes_no_host_calls() {
    let engine = ScriptedEngine::returning(vec![]);
    let (adapter, _dir) = loaded_adapter(engine.clone()).await;
    let host = RecordingHost::with(vec![("text", json!("hello"))]);

    let err = adapter.run_graph(&host, "Missing").await.unwrap_err();
    assert!(matches!(err, RunError::GraphNotFound(ref name) if name == "Missing"));

    assert!(adapter.run_graph_or_empty(&host, "Missing").await.is_empty());
    assert!(host.calls().is_empty());
    assert!(engine.seen().is_empty());
}

#[tokio::test]
async fn scenario_f_unparsable_reload_keeps_previous_project() {
    let engine = ScriptedEngine::returning(vec![]);
    let (adapter, dir) = loaded_adapter(engine).await;
    let before = adapter.store().current().unwrap();

    write_project(&dir, "{{{ definitely not a project");
    assert!(adapter.reload().await.is_err());

    let after = adapter.store().current().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(adapter.graphs().unwrap().contains_key("Main"));
}

#[tokio::test]
async fn run_without_project_fails_gracefully() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir.path().join("nope.yaml"));
    let adapter = RivetAdapter::new(config, ScriptedEngine::returning(vec![]));
    let _handle = adapter.on_initialize().await;
    let host = RecordingHost::default();

    assert!(adapter.graphs().is_none());
    assert!(matches!(
        adapter.run_graph(&host, "Main").await,
        Err(RunError::NoProject)
    ));
    assert!(adapter.run_graph_or_empty(&host, "Main").await.is_empty());
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn execution_failure_is_a_typed_error() {
    let engine = ScriptedEngine::failing("model timeout");
    let (adapter, _dir) = loaded_adapter(engine).await;
    let host = RecordingHost::with(vec![("text", json!("hi"))]);

    let err = adapter.run_graph(&host, "Main").await.unwrap_err();
    assert!(matches!(err, RunError::Execution(EngineError::Processor(_))));
    assert!(host.updates().is_empty());
}

#[tokio::test]
async fn execution_failure_maps_to_empty_outputs() {
    let engine = ScriptedEngine::failing("boom");
    let (adapter, _dir) = loaded_adapter(engine).await;
    let host = RecordingHost::default();

    assert!(adapter.run_graph_or_empty(&host, "Main").await.is_empty());
}

#[tokio::test]
async fn credentials_are_forwarded() {
    let engine = ScriptedEngine::returning(vec![]);
    let dir = TempDir::new().unwrap();
    let path = write_project(&dir, MAIN_PROJECT);
    let mut config = config_for(&path);
    config.api_key = Some("sk-secret".into());
    config.endpoint_url = Some("http://localhost:8080/v1".into());
    let adapter = RivetAdapter::new(config, engine.clone());
    adapter.reload().await.unwrap();

    adapter.run_graph(&RecordingHost::default(), "Main").await.unwrap();

    let creds = &engine.seen()[0].credentials;
    assert_eq!(creds.api_key.as_deref(), Some("sk-secret"));
    assert_eq!(creds.endpoint_url.as_deref(), Some("http://localhost:8080/v1"));
    assert!(!format!("{:?}", creds).contains("sk-secret"));
}

// ============================================================
// Hot reload
// ============================================================

async fn wait_for<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..300 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

fn watched_config(path: &Path) -> AdapterConfig {
    let mut config = AdapterConfig::new(path);
    config.watch.poll_interval_ms = 10;
    config.watch.stability_threshold_ms = 20;
    config
}

fn has_graph(adapter: &RivetAdapter, name: &str) -> bool {
    adapter.graphs().is_some_and(|g| g.contains_key(name))
}

#[tokio::test]
async fn file_change_hot_reloads_project() {
    let dir = TempDir::new().unwrap();
    let path = write_project(&dir, MAIN_PROJECT);

    let adapter = RivetAdapter::new(watched_config(&path), ScriptedEngine::returning(vec![]));
    let handle = adapter.on_initialize().await;
    assert!(handle.is_active());
    assert!(has_graph(&adapter, "Main"));

    std::fs::write(&path, OTHER_PROJECT).unwrap();
    let reloaded = wait_for(|| has_graph(&adapter, "Other")).await;
    assert!(reloaded, "project was not reloaded after change");

    let other = adapter.graphs().unwrap();
    assert_eq!(other["Other"].inputs.len(), 3);

    handle.shutdown().await;
}

#[tokio::test]
async fn dropped_handle_stops_reloading() {
    let dir = TempDir::new().unwrap();
    let path = write_project(&dir, MAIN_PROJECT);

    let adapter = RivetAdapter::new(watched_config(&path), ScriptedEngine::returning(vec![]));
    drop(adapter.on_initialize().await);

    std::fs::write(&path, OTHER_PROJECT).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(has_graph(&adapter, "Main"));
}

#[tokio::test]
async fn detached_handle_keeps_reloading() {
    let dir = TempDir::new().unwrap();
    let path = write_project(&dir, MAIN_PROJECT);

    let adapter = RivetAdapter::new(watched_config(&path), ScriptedEngine::returning(vec![]));
    adapter.on_initialize().await.detach();
    assert!(has_graph(&adapter, "Main"));

    std::fs::write(&path, OTHER_PROJECT).unwrap();
    let reloaded = wait_for(|| has_graph(&adapter, "Other")).await;
    assert!(reloaded, "detached watch stopped reloading");
}

#[tokio::test]
async fn watched_unparsable_write_keeps_previous_project() {
    let dir = TempDir::new().unwrap();
    let path = write_project(&dir, MAIN_PROJECT);

    let adapter = RivetAdapter::new(watched_config(&path), ScriptedEngine::returning(vec![]));
    let handle = adapter.on_initialize().await;
    let before = adapter.store().current().unwrap();

    std::fs::write(&path, "{{{ definitely not a project").unwrap();
    // Well past the 20ms stability threshold, so the bad write has been
    // picked up and rejected by the reload loop.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let after = adapter.store().current().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(has_graph(&adapter, "Main"));

    // The watch survives the failed reload.
    assert!(handle.is_active());
    std::fs::write(&path, OTHER_PROJECT).unwrap();
    assert!(wait_for(|| has_graph(&adapter, "Other")).await);

    handle.shutdown().await;
}
