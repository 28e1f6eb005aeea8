//! Project document model
//!
//! A project is a set of graphs, each an ordered list of nodes. Two document
//! layouts are accepted, both as YAML or JSON:
//!
//! - Rivet v4: `{ version, data: { metadata, graphs } }`, nodes keyed as
//!   `'[<id>]:<type> "<title>"'` with the node body under the key.
//! - Flat: `{ metadata, graphs }`, nodes as a list of `{ id, type, title, data }`.
//!
//! Everything the engine stores besides node identity and `data` (visual
//! layout, connections, attachments) is ignored here.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

pub const GRAPH_INPUT_TYPE: &str = "graphInput";
pub const GRAPH_OUTPUT_TYPE: &str = "graphOutput";
pub const PARTIAL_OUTPUT_FLAG: &str = "useAsGraphPartialOutput";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphMetadata {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: String,
}

/// A parsed project. Graphs are kept in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Project {
    pub metadata: ProjectMetadata,
    pub graphs: IndexMap<String, Graph>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    pub id: String,
    pub metadata: GraphMetadata,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    GraphInput,
    GraphOutput,
    Other,
}

impl Graph {
    /// Human-readable name; falls back to the graph id when the document has none.
    pub fn display_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or(&self.id)
    }
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            title: None,
            data,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.node_type.as_str() {
            GRAPH_INPUT_TYPE => NodeKind::GraphInput,
            GRAPH_OUTPUT_TYPE => NodeKind::GraphOutput,
            _ => NodeKind::Other,
        }
    }

    /// External-facing slot name of an input/output node (`data.id`).
    pub fn slot_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    pub fn is_partial_output(&self) -> bool {
        self.data.get(PARTIAL_OUTPUT_FLAG).is_some_and(truthy)
    }
}

/// Loose truthiness used for node flags.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl Project {
    /// Parse a project document (YAML or JSON, either layout).
    pub fn from_document(text: &str) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_str(text)?;
        let raw = match raw {
            RawDocument::Versioned { data, .. } => data,
            RawDocument::Flat(project) => project,
        };

        let mut graphs = IndexMap::with_capacity(raw.graphs.len());
        for (graph_id, raw_graph) in raw.graphs {
            let nodes = match raw_graph.nodes {
                RawNodes::Listed(nodes) => nodes,
                RawNodes::Keyed(keyed) => keyed
                    .into_iter()
                    .map(|(key, body)| {
                        let (id, node_type, title) = parse_node_key(&key)?;
                        Ok(Node {
                            id,
                            node_type,
                            title,
                            data: body.data,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            };
            let id = raw_graph
                .metadata
                .id
                .clone()
                .unwrap_or_else(|| graph_id.clone());
            let graph = Graph {
                id,
                metadata: raw_graph.metadata,
                nodes,
            };
            graphs.insert(graph_id, graph);
        }

        Ok(Self {
            metadata: raw.metadata,
            graphs,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graphs.values().map(|g| g.nodes.len()).sum()
    }
}

impl std::str::FromStr for Project {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_document(s)
    }
}

fn node_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^\[(?P<id>[^\]]+)\]:(?P<type>[^\s"]+)(?:\s+"(?P<title>.*)")?$"#)
            .expect("node key pattern is valid")
    })
}

/// Split a v4 node key `[id]:type "title"` into its parts.
pub fn parse_node_key(key: &str) -> Result<(String, String, Option<String>)> {
    let caps = node_key_pattern()
        .captures(key.trim())
        .ok_or_else(|| Error::InvalidNodeKey(key.to_string()))?;
    Ok((
        caps["id"].to_string(),
        caps["type"].to_string(),
        caps.name("title").map(|m| m.as_str().to_string()),
    ))
}

// ============================================================
// Raw document shapes
// ============================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Versioned {
        #[allow(dead_code)]
        version: u32,
        data: RawProject,
    },
    Flat(RawProject),
}

#[derive(Deserialize)]
struct RawProject {
    #[serde(default)]
    metadata: ProjectMetadata,
    graphs: IndexMap<String, RawGraph>,
}

#[derive(Deserialize)]
struct RawGraph {
    #[serde(default)]
    metadata: GraphMetadata,
    #[serde(default)]
    nodes: RawNodes,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNodes {
    Keyed(IndexMap<String, RawKeyedNode>),
    Listed(Vec<Node>),
}

impl Default for RawNodes {
    fn default() -> Self {
        Self::Listed(Vec::new())
    }
}

#[derive(Deserialize)]
struct RawKeyedNode {
    #[serde(default)]
    data: Value,
}
