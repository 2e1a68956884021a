use super::json_fields::{embedded_object, record_cost, record_tokens};
use super::LogParser;
use crate::metrics::{EngineKind, LogMetrics, ToolTracker};
use regex::Regex;
use std::sync::OnceLock;

/// Logs of the hosted coding agent: narrative lines with embedded JSON usage
/// records, explicit `Iteration N` / `Turn N` markers and `Calling: tool` prose.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopilotAgentParser;

fn turn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:\S+\s+)?(?:\[[^\]]*\]\s*)*(?:iteration|turn)\s*#?\d+")
            .expect("valid turn marker regex")
    })
}

fn tool_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:calling|tool call):\s*([A-Za-z0-9_./\-]+)")
            .expect("valid tool call regex")
    })
}

fn error_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\berror\b[:\]]").expect("valid error regex"))
}

fn warning_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bwarn(?:ing)?\b[:\]]").expect("valid warning regex"))
}

impl LogParser for CopilotAgentParser {
    fn engine(&self) -> EngineKind {
        EngineKind::CopilotAgent
    }

    fn parse(&self, content: &str) -> LogMetrics {
        let mut metrics = LogMetrics::default();
        let mut tools = ToolTracker::default();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if turn_re().is_match(trimmed) {
                metrics.turns += 1;
                tools.end_episode();
                continue;
            }

            if let Some(captures) = tool_re().captures(trimmed) {
                tools.record(&captures[1]);
                continue;
            }

            if trimmed.contains('{') {
                if let Some(record) = embedded_object(trimmed) {
                    metrics.token_usage =
                        metrics.token_usage.saturating_add(record_tokens(&record));
                    metrics.estimated_cost += record_cost(&record);
                    continue;
                }
            }

            if error_re().is_match(trimmed) {
                metrics.error_count += 1;
            } else if warning_re().is_match(trimmed) {
                metrics.warning_count += 1;
            }
        }

        tools.finish_into(&mut metrics);
        metrics
    }
}
