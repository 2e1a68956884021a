use super::safe_outputs::item_type;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingToolReport {
    pub tool: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub alternatives: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDataReport {
    pub data_type: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub alternatives: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoopReport {
    pub message: String,
}

fn text_field(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn items_of_type<'a>(items: &'a [Value], kind: &'a str) -> impl Iterator<Item = &'a Value> {
    items
        .iter()
        .filter(move |item| item_type(item).as_deref() == Some(kind))
}

pub fn extract_missing_tools(items: &[Value]) -> Vec<MissingToolReport> {
    items_of_type(items, "missing_tool")
        .filter_map(|item| {
            let tool = text_field(item, "tool");
            (!tool.is_empty()).then(|| MissingToolReport {
                tool,
                reason: text_field(item, "reason"),
                alternatives: text_field(item, "alternatives"),
                timestamp: text_field(item, "timestamp"),
            })
        })
        .collect()
}

pub fn extract_missing_data(items: &[Value]) -> Vec<MissingDataReport> {
    items_of_type(items, "missing_data")
        .map(|item| MissingDataReport {
            data_type: text_field(item, "data_type"),
            reason: text_field(item, "reason"),
            context: text_field(item, "context"),
            alternatives: text_field(item, "alternatives"),
        })
        .filter(|report| !report.data_type.is_empty() || !report.reason.is_empty())
        .collect()
}

pub fn extract_noops(items: &[Value]) -> Vec<NoopReport> {
    items_of_type(items, "noop")
        .map(|item| NoopReport {
            message: text_field(item, "message"),
        })
        .collect()
}
