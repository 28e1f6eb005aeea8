//! Rivetlink Core - project model, graph metadata, tagged values, configuration

pub mod config;
pub mod error;
pub mod graph_data;
pub mod project;
pub mod value;

pub use config::{AdapterConfig, WatchConfig};
pub use error::{Error, Result};
pub use graph_data::{extract_graph_data, GraphData};
pub use project::{Graph, GraphMetadata, Node, NodeKind, Project, ProjectMetadata};
pub use value::*;
