use super::json_fields::{as_u64, record_cost, record_tokens};
use super::LogParser;
use crate::metrics::{EngineKind, LogMetrics, ToolTracker};
use serde_json::Value;

/// Stream-json logs: either one JSON array or one message object per line,
/// possibly interleaved with plain debug output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClaudeParser;

pub(crate) fn claude_entries(content: &str) -> Vec<Value> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        if let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(trimmed) {
            return entries;
        }
    }

    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(line) {
                entries.extend(items);
                continue;
            }
        }
        if line.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<Value>(line) {
                if value.is_object() {
                    entries.push(value);
                }
            }
        }
    }
    entries
}

impl LogParser for ClaudeParser {
    fn engine(&self) -> EngineKind {
        EngineKind::Claude
    }

    fn parse(&self, content: &str) -> LogMetrics {
        let mut metrics = LogMetrics::default();
        let mut tools = ToolTracker::default();
        let mut saw_result = false;
        let mut assistant_messages = 0u32;
        let mut assistant_tokens = 0u64;

        for entry in claude_entries(content) {
            match entry.get("type").and_then(Value::as_str) {
                Some("result") => {
                    saw_result = true;
                    metrics.token_usage = metrics.token_usage.saturating_add(record_tokens(&entry));
                    metrics.estimated_cost += record_cost(&entry);
                    if let Some(turns) = entry.get("num_turns").and_then(as_u64) {
                        let turns = u32::try_from(turns).unwrap_or(u32::MAX);
                        metrics.turns = metrics.turns.max(turns);
                    }
                    if entry.get("is_error").and_then(Value::as_bool) == Some(true) {
                        metrics.error_count += 1;
                    }
                }
                Some("assistant") => {
                    assistant_messages += 1;
                    let Some(message) = entry.get("message") else {
                        continue;
                    };
                    if let Some(usage) = message.get("usage") {
                        assistant_tokens = assistant_tokens
                            .saturating_add(super::json_fields::sum_token_components(usage));
                    }
                    let mut used_tool = false;
                    let mut wrote_text = false;
                    for item in content_items(message) {
                        match item.get("type").and_then(Value::as_str) {
                            Some("tool_use") => {
                                if let Some(name) = item.get("name").and_then(Value::as_str) {
                                    tools.record(name);
                                    used_tool = true;
                                }
                            }
                            Some("text") => wrote_text = true,
                            _ => {}
                        }
                    }
                    if wrote_text && !used_tool {
                        tools.end_episode();
                    }
                }
                Some("user") => {
                    let Some(message) = entry.get("message") else {
                        continue;
                    };
                    for item in content_items(message) {
                        if item.get("type").and_then(Value::as_str) == Some("tool_result")
                            && item.get("is_error").and_then(Value::as_bool) == Some(true)
                        {
                            metrics.error_count += 1;
                        }
                    }
                }
                _ => {}
            }
        }

        if !saw_result {
            metrics.token_usage = assistant_tokens;
            metrics.turns = assistant_messages;
        }
        tools.finish_into(&mut metrics);
        metrics
    }
}

fn content_items(message: &Value) -> &[Value] {
    message
        .get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_entry_supplies_tokens_cost_and_turns() {
        let log = r#"[
  {"type":"system","subtype":"init","mcp_servers":[]},
  {"type":"assistant","message":{"content":[{"type":"text","text":"Looking"},{"type":"tool_use","name":"Bash","input":{}}]}},
  {"type":"user","message":{"content":[{"type":"tool_result","is_error":true}]}},
  {"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read","input":{}}]}},
  {"type":"assistant","message":{"content":[{"type":"text","text":"Done"}]}},
  {"type":"result","num_turns":4,"total_cost_usd":0.42,"usage":{"input_tokens":100,"cache_read_input_tokens":50,"output_tokens":25}}
]"#;

        let metrics = ClaudeParser.parse(log);
        assert_eq!(metrics.token_usage, 175);
        assert!((metrics.estimated_cost - 0.42).abs() < 1e-9);
        assert_eq!(metrics.turns, 4);
        assert_eq!(metrics.error_count, 1);
        assert_eq!(
            metrics.tool_sequences,
            vec![vec!["Bash".to_string(), "Read".to_string()]]
        );
    }

    #[test]
    fn jsonl_without_result_counts_assistant_messages() {
        let log = "debug: starting\n\
{\"type\":\"assistant\",\"message\":{\"usage\":{\"input_tokens\":5,\"output_tokens\":5},\"content\":[{\"type\":\"tool_use\",\"name\":\"Edit\"}]}}\n\
{\"type\":\"assistant\",\"message\":{\"usage\":{\"input_tokens\":1,\"output_tokens\":2},\"content\":[{\"type\":\"text\",\"text\":\"ok\"}]}}\n";

        let metrics = ClaudeParser.parse(log);
        assert_eq!(metrics.turns, 2);
        assert_eq!(metrics.token_usage, 13);
        assert_eq!(metrics.tool_calls.len(), 1);
    }

    #[test]
    fn result_turns_beyond_u32_saturate() {
        let log = r#"{"type":"result","num_turns":8589934593,"usage":{"input_tokens":1}}"#;
        assert_eq!(ClaudeParser.parse(log).turns, u32::MAX);
    }
}
