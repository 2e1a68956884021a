use super::json_fields::{as_u64, record_cost, record_tokens, whole_line_object};
use super::LogParser;
use crate::metrics::{EngineKind, LogMetrics};

/// Fallback for unknown engines.
///
/// Only lines that are complete JSON objects are read, and only their obvious
/// token, cost and turn fields. Anything else yields zeroed metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericParser;

impl LogParser for GenericParser {
    fn engine(&self) -> EngineKind {
        EngineKind::Generic
    }

    fn parse(&self, content: &str) -> LogMetrics {
        let mut metrics = LogMetrics::default();
        for line in content.lines() {
            let Some(record) = whole_line_object(line) else {
                continue;
            };
            metrics.token_usage = metrics.token_usage.saturating_add(record_tokens(&record));
            metrics.estimated_cost += record_cost(&record);
            if let Some(turns) = record.get("num_turns").and_then(as_u64) {
                let turns = u32::try_from(turns).unwrap_or(u32::MAX);
                metrics.turns = metrics.turns.max(turns);
            }
        }
        metrics
    }
}
