//! Input resolution: host values → tagged engine inputs

use crate::host::{HostApi, HostResult};
use indexmap::IndexMap;
use rivetlink_core::{GraphData, InputMap, TaggedValue};
use serde_json::Value;
use tracing::{debug, info};

/// Fetch every declared input from the host and wrap it for the engine.
///
/// Slots are fetched one at a time in declaration order. Undefined or null
/// values become the empty string, so every declared slot is present.
pub async fn resolve_inputs(
    graph: &GraphData,
    host: &dyn HostApi,
    verbose: bool,
) -> HostResult<InputMap> {
    let mut fetched: IndexMap<String, Option<Value>> =
        IndexMap::with_capacity(graph.inputs.len());

    for slot in graph.inputs.keys() {
        if verbose {
            info!("Fetching input '{}' from host", slot);
        }
        let value = host.get(slot).await?;
        if verbose {
            info!("Input '{}' value: {:?}", slot, value);
        } else {
            debug!("Input '{}' value: {:?}", slot, value);
        }
        fetched.insert(slot.clone(), value);
    }

    let inputs = fetched
        .into_iter()
        .map(|(slot, value)| {
            let value = match value {
                None | Some(Value::Null) => {
                    if verbose {
                        info!("Missing input '{}', using empty string", slot);
                    } else {
                        debug!("Missing input '{}', using empty string", slot);
                    }
                    Value::String(String::new())
                }
                Some(v) => v,
            };
            (slot, TaggedValue::wrap(value))
        })
        .collect();

    Ok(inputs)
}
