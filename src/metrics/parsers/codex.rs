use super::json_fields::{classify_line, LineSeverity};
use super::LogParser;
use crate::metrics::{EngineKind, LogMetrics, ToolTracker};
use regex::Regex;
use std::sync::OnceLock;

/// Plain-text codex exec logs.
///
/// `thinking` markers open a turn, `tool server.method(...)` and `exec` lines
/// are tool calls, and every `tokens used` report is an independent charge.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodexParser;

fn tool_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\]\s*)tool\s+([A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*)\(")
            .expect("valid tool call regex")
    })
}

fn exec_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\]\s*)exec\s+\S").expect("valid exec regex")
    })
}

fn tokens_used_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)tokens used:?\s*([0-9][0-9,]*)").expect("valid tokens used regex")
    })
}

fn is_thinking_marker(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed == "thinking" || trimmed.ends_with("] thinking")
}

fn parse_count(raw: &str) -> Option<u64> {
    raw.trim().replace(',', "").parse::<u64>().ok()
}

impl LogParser for CodexParser {
    fn engine(&self) -> EngineKind {
        EngineKind::Codex
    }

    fn parse(&self, content: &str) -> LogMetrics {
        let mut metrics = LogMetrics::default();
        let mut tools = ToolTracker::default();
        let mut awaiting_token_count = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if awaiting_token_count {
                awaiting_token_count = false;
                if let Some(count) = parse_count(trimmed) {
                    metrics.token_usage = metrics.token_usage.saturating_add(count);
                    continue;
                }
            }

            if is_thinking_marker(trimmed) {
                metrics.turns += 1;
                tools.end_episode();
                continue;
            }

            if let Some(captures) = tool_call_re().captures(trimmed) {
                tools.record(&captures[1]);
                continue;
            }
            if exec_re().is_match(trimmed) {
                tools.record("bash");
                continue;
            }

            if let Some(captures) = tokens_used_re().captures(trimmed) {
                if let Some(count) = parse_count(&captures[1]) {
                    metrics.token_usage = metrics.token_usage.saturating_add(count);
                }
                continue;
            }
            if trimmed.eq_ignore_ascii_case("tokens used") {
                awaiting_token_count = true;
                continue;
            }

            match classify_line(trimmed) {
                LineSeverity::Error => metrics.error_count += 1,
                LineSeverity::Warning => metrics.warning_count += 1,
                LineSeverity::Other => {}
            }
        }

        tools.finish_into(&mut metrics);
        metrics
    }
}
