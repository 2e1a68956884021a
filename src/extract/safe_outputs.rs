use crate::artifacts::AnalysisError;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// `missing-tool` and `missing_tool` name the same output type.
pub fn normalize_safe_output_type(raw: &str) -> String {
    raw.trim().replace('-', "_").to_ascii_lowercase()
}

/// Reads structured output items from either the `{"items": [...]}` document
/// or the older one-item-per-line format.
pub fn load_safe_output_items(path: &Path) -> Result<Vec<Value>, AnalysisError> {
    let raw = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(document)) => {
            if let Some(Value::Array(items)) = document.get("items") {
                return Ok(items.clone());
            }
            if document.contains_key("type") {
                return Ok(vec![Value::Object(document)]);
            }
            return Ok(Vec::new());
        }
        Ok(Value::Array(items)) => return Ok(items),
        Ok(_) => return Ok(Vec::new()),
        Err(_) => {}
    }

    let mut items = Vec::new();
    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item = serde_json::from_str::<Value>(line).map_err(|source| AnalysisError::Json {
            path: path.display().to_string(),
            source,
        })?;
        items.push(item);
    }
    Ok(items)
}

pub fn item_type(item: &Value) -> Option<String> {
    item.get("type")
        .and_then(Value::as_str)
        .map(normalize_safe_output_type)
}

/// Distinct normalized output types, sorted.
pub fn safe_output_types(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(item_type)
        .filter(|kind| !kind.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
