use crate::error::{GeminiError, Result};
use kgmatch_graph::KnowledgeGraph;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\s*```\s*$").expect("static regex")
});

/// Remove a surrounding Markdown code fence (```json ... ```), if any
pub fn strip_code_fences(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

/// Parse model output into a graph.
///
/// Attribute values that are not strings (numbers, booleans, nested values) are converted to
/// their JSON text; `null` becomes an empty string.
pub fn parse_graph_json(text: &str) -> Result<KnowledgeGraph> {
    let body = strip_code_fences(text);
    let mut value: Value = serde_json::from_str(body)
        .map_err(|err| GeminiError::InvalidResponse(format!("model output is not JSON: {err}")))?;
    if !value.is_object() {
        return Err(GeminiError::InvalidResponse(
            "model output is not a JSON object".to_string(),
        ));
    }
    stringify_attribute_values(&mut value);
    serde_json::from_value(value)
        .map_err(|err| GeminiError::InvalidResponse(format!("model output is not a graph: {err}")))
}

fn stringify_attribute_values(value: &mut Value) {
    let Some(entities) = value.get_mut("entities").and_then(Value::as_array_mut) else {
        return;
    };
    for entity in entities {
        let Some(attributes) = entity.get_mut("attributes").and_then(Value::as_object_mut) else {
            continue;
        };
        for attr in attributes.values_mut() {
            let text = match attr {
                Value::String(_) => continue,
                Value::Null => String::new(),
                ref other => other.to_string(),
            };
            *attr = Value::String(text);
        }
    }
}
