use serde_json::Value;

/// Token counters that make up one usage record; they are summed, never maxed.
const TOKEN_COMPONENT_KEYS: [&str; 6] = [
    "input_tokens",
    "output_tokens",
    "cache_creation_input_tokens",
    "cache_read_input_tokens",
    "prompt_tokens",
    "completion_tokens",
];

const COST_KEYS: [&str; 4] = ["total_cost_usd", "cost_usd", "estimated_cost", "cost"];

pub(crate) fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64)),
        Value::String(raw) => raw.trim().replace(',', "").parse::<u64>().ok(),
        _ => None,
    }
}

/// Sums the token sub-components of a usage object, falling back to `total_tokens`.
pub(crate) fn sum_token_components(usage: &Value) -> u64 {
    let Some(object) = usage.as_object() else {
        return 0;
    };
    let mut total = 0u64;
    let mut found = false;
    for key in TOKEN_COMPONENT_KEYS {
        if let Some(value) = object.get(key).and_then(as_u64) {
            total = total.saturating_add(value);
            found = true;
        }
    }
    if found {
        return total;
    }
    object.get("total_tokens").and_then(as_u64).unwrap_or(0)
}

/// Token total for a JSON record: a nested `usage` object or top-level counters.
pub(crate) fn record_tokens(record: &Value) -> u64 {
    if let Some(usage) = record.get("usage") {
        return sum_token_components(usage);
    }
    let direct = sum_token_components(record);
    if direct > 0 {
        return direct;
    }
    record.get("tokens").and_then(as_u64).unwrap_or(0)
}

pub(crate) fn record_cost(record: &Value) -> f64 {
    for key in COST_KEYS {
        if let Some(cost) = record.get(key).and_then(Value::as_f64) {
            if cost.is_finite() && cost > 0.0 {
                return cost;
            }
        }
    }
    0.0
}

/// A line that is entirely a JSON object.
pub(crate) fn whole_line_object(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') || !trimmed.ends_with('}') {
        return None;
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(Value::is_object)
}

/// A JSON object embedded in a narrative line, such as `2024-05-01 INFO {"usage":...}`.
pub(crate) fn embedded_object(line: &str) -> Option<Value> {
    if let Some(value) = whole_line_object(line) {
        return Some(value);
    }
    let start = line.find('{')?;
    let end = line.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&line[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineSeverity {
    Error,
    Warning,
    Other,
}

pub(crate) fn classify_line(line: &str) -> LineSeverity {
    let lower = line.to_ascii_lowercase();
    if line.contains("ERROR") || lower.contains("error:") || lower.contains("[error]") {
        LineSeverity::Error
    } else if line.contains("WARN") || lower.contains("warning:") || lower.contains("[warn") {
        LineSeverity::Warning
    } else {
        LineSeverity::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn usage_components_are_summed() {
        let usage = json!({
            "input_tokens": 10,
            "cache_creation_input_tokens": 5,
            "cache_read_input_tokens": 100,
            "output_tokens": 7
        });
        assert_eq!(sum_token_components(&usage), 122);
        assert_eq!(sum_token_components(&json!({"total_tokens": 42})), 42);
    }

    #[test]
    fn embedded_json_is_found_inside_narrative_lines() {
        let value = embedded_object("2024-05-01T10:00:00Z INFO response {\"usage\":{\"prompt_tokens\":3}}")
            .expect("embedded object");
        assert_eq!(record_tokens(&value), 3);
        assert!(embedded_object("no json here").is_none());
        assert!(embedded_object("broken {json").is_none());
    }

    #[test]
    fn string_counts_with_separators_parse() {
        assert_eq!(as_u64(&json!("12,345")), Some(12345));
        assert_eq!(as_u64(&json!(-1)), None);
    }
}
