use super::json_fields::{classify_line, record_tokens, LineSeverity};
use super::LogParser;
use crate::metrics::{EngineKind, LogMetrics, ToolTracker};
use serde_json::Value;

const DATA_MARKER: &str = "[DEBUG] data:";

/// Copilot CLI debug logs, where each model response is dumped as a
/// (possibly multi-line) JSON block after a `[DEBUG] data:` marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopilotParser;

fn brace_balance(text: &str) -> i64 {
    let mut depth = 0i64;
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Collects the JSON blocks that follow each data marker.
fn data_blocks(content: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<(String, i64)> = None;

    for line in content.lines() {
        if let Some((buffer, depth)) = current.as_mut() {
            let body = strip_log_prefix(line);
            buffer.push('\n');
            buffer.push_str(body);
            *depth += brace_balance(body);
            if *depth <= 0 {
                if let Some((block, _)) = current.take() {
                    blocks.push(block);
                }
            }
            continue;
        }

        let Some(position) = line.find(DATA_MARKER) else {
            continue;
        };
        let rest = line[position + DATA_MARKER.len()..].trim();
        if rest.is_empty() {
            current = Some((String::new(), 0));
            continue;
        }
        let depth = brace_balance(rest);
        if depth <= 0 {
            blocks.push(rest.to_string());
        } else {
            current = Some((rest.to_string(), depth));
        }
    }

    if let Some((block, _)) = current {
        blocks.push(block);
    }
    blocks
}

/// Continuation lines may carry a `2025-01-01T00:00:00.000Z [DEBUG] ` prefix.
fn strip_log_prefix(line: &str) -> &str {
    match line.find("[DEBUG] ") {
        Some(position) => &line[position + "[DEBUG] ".len()..],
        None => line,
    }
}

impl LogParser for CopilotParser {
    fn engine(&self) -> EngineKind {
        EngineKind::Copilot
    }

    fn parse(&self, content: &str) -> LogMetrics {
        let mut metrics = LogMetrics::default();
        let mut tools = ToolTracker::default();

        for block in data_blocks(content) {
            let Ok(response) = serde_json::from_str::<Value>(block.trim()) else {
                continue;
            };
            metrics.token_usage = metrics.token_usage.saturating_add(record_tokens(&response));

            let Some(choices) = response.get("choices").and_then(Value::as_array) else {
                continue;
            };
            metrics.turns += 1;
            for choice in choices {
                let calls = choice
                    .pointer("/message/tool_calls")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                for call in calls {
                    if let Some(name) = call.pointer("/function/name").and_then(Value::as_str) {
                        tools.record(name);
                    }
                }
            }
            tools.end_episode();
        }

        for line in content.lines() {
            if line.contains(DATA_MARKER) {
                continue;
            }
            match classify_line(line) {
                LineSeverity::Error => metrics.error_count += 1,
                LineSeverity::Warning => metrics.warning_count += 1,
                LineSeverity::Other => {}
            }
        }

        tools.finish_into(&mut metrics);
        metrics
    }
}
