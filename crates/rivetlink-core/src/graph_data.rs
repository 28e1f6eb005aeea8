//! Graph metadata extraction
//!
//! Derives, per graph display name, the declared input/output slots and the
//! optional partial-output node. Recomputed from the project on every run.

use crate::project::{NodeKind, Project};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    /// Slot id → node id, in order of first discovery.
    pub inputs: IndexMap<String, String>,
    /// Slot id → node id, in order of first discovery.
    pub outputs: IndexMap<String, String>,
    pub partial_output_node_id: Option<String>,
}

/// Build the graph-name → [`GraphData`] mapping for a project.
///
/// Collisions resolve last-wins in document order: a repeated slot id keeps
/// its first position but takes the later node, a repeated graph name takes the
/// later graph, and the last flagged node is the partial output.
pub fn extract_graph_data(project: &Project) -> IndexMap<String, GraphData> {
    let mut graph_data = IndexMap::with_capacity(project.graphs.len());

    for graph in project.graphs.values() {
        let mut data = GraphData::default();

        for node in &graph.nodes {
            match node.kind() {
                NodeKind::GraphInput | NodeKind::GraphOutput => match node.slot_id() {
                    Some(slot) => {
                        let slots = if node.kind() == NodeKind::GraphInput {
                            &mut data.inputs
                        } else {
                            &mut data.outputs
                        };
                        slots.insert(slot.to_string(), node.id.clone());
                    }
                    None => warn!(
                        "Graph '{}': {} node {} has no slot id, skipping",
                        graph.display_name(),
                        node.node_type,
                        node.id
                    ),
                },
                NodeKind::Other => {}
            }

            if node.is_partial_output() {
                data.partial_output_node_id = Some(node.id.clone());
            }
        }

        let name = graph.display_name().to_string();
        if graph_data.contains_key(&name) {
            warn!("Duplicate graph name '{}' (id {}), later graph wins", name, graph.id);
        }
        graph_data.insert(name, data);
    }

    graph_data
}
