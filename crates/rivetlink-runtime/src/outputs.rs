//! Output resolution: engine results → flat host values
//!
//! `cost` is dropped, including a `cost` field inside merged JSON. Keys
//! starting with `json` carry a JSON object whose fields are merged into the
//! output map. Everything else is unwrapped.

use crate::host::HostApi;
use rivetlink_core::{OutputMap, ResultMap, TaggedValue, COST_KEY, JSON_PREFIX};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

/// Flatten a processor result into host-ready values. A bad JSON entry only
/// loses its own contribution.
pub fn resolve_outputs(result: &ResultMap, verbose: bool) -> OutputMap {
    let mut outputs = OutputMap::with_capacity(result.len());

    for (key, tagged) in result {
        if key.starts_with(JSON_PREFIX) {
            if verbose {
                info!("Processing JSON output for key '{}'", key);
            }
            match json_fields(tagged) {
                Ok(fields) => {
                    if verbose {
                        let names: Vec<_> = fields.keys().collect();
                        info!("JSON output '{}' parsed: {:?}", key, names);
                    }
                    for (field, value) in fields {
                        if field == COST_KEY {
                            debug!("Dropping cost field from JSON output '{}'", key);
                            continue;
                        }
                        outputs.insert(field, value);
                    }
                }
                Err(e) => error!("Error parsing JSON result for key '{}': {}", key, e),
            }
        } else if key == COST_KEY {
            debug!("Dropping cost report: {}", tagged.value);
        } else {
            outputs.insert(key.clone(), tagged.value.clone());
        }
    }

    outputs
}

fn json_fields(tagged: &TaggedValue) -> Result<Map<String, Value>, String> {
    let parsed = match &tagged.value {
        Value::String(text) => {
            serde_json::from_str::<Value>(text).map_err(|e| e.to_string())?
        }
        Value::Object(obj) => Value::Object(obj.clone()),
        other => return Err(format!("expected a JSON string, got {}", type_name(other))),
    };
    match parsed {
        Value::Object(fields) => Ok(fields),
        other => Err(format!("expected a JSON object, got {}", type_name(&other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Push every output to the host, one `update` at a time in map order.
/// Failed updates are logged and skipped. Returns how many succeeded.
pub async fn publish_outputs(outputs: &OutputMap, host: &dyn HostApi, verbose: bool) -> usize {
    let mut published = 0;
    for (key, value) in outputs {
        if verbose {
            info!("Updating '{}' on host with value: {}", key, value);
        }
        match host.update(key, value.clone()).await {
            Ok(()) => published += 1,
            Err(e) => error!("Failed to update '{}' on host: {}", key, e),
        }
    }
    published
}
