use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub mod aggregator;
pub mod detection;
pub mod engine;
pub mod parsers;

pub use aggregator::{aggregate_run_metrics, is_log_file, AggregatedMetrics};
pub use detection::{
    default_probes, detect_hosted_agent, select_engine, AgentProbe, DetectionContext,
    EngineSelection, SelectionSource,
};
pub use engine::EngineKind;
pub use parsers::{parser_for, LogParser};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallInfo {
    pub name: String,
    pub call_count: u32,
}

/// Normalized per-run metrics shared by every engine parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMetrics {
    #[serde(default)]
    pub token_usage: u64,
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default)]
    pub turns: u32,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallInfo>,
    #[serde(default)]
    pub tool_sequences: Vec<Vec<String>>,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub warning_count: u32,
}

impl LogMetrics {
    /// Folds one file's metrics into the run total.
    ///
    /// Tokens, cost and line counts add up. Turns describe the whole run's
    /// conversational depth, so the run keeps the deepest file instead of a sum.
    pub fn merge_file(&mut self, file: LogMetrics) {
        self.token_usage = self.token_usage.saturating_add(file.token_usage);
        self.estimated_cost += file.estimated_cost;
        self.turns = self.turns.max(file.turns);
        self.tool_calls.extend(file.tool_calls);
        self.tool_sequences.extend(file.tool_sequences);
        self.error_count = self.error_count.saturating_add(file.error_count);
        self.warning_count = self.warning_count.saturating_add(file.warning_count);
    }

    /// Collapses the accumulated tool-call list into one entry per tool name.
    pub fn tool_call_totals(&self) -> Vec<ToolCallInfo> {
        let mut totals: BTreeMap<&str, u32> = BTreeMap::new();
        for call in &self.tool_calls {
            let entry = totals.entry(call.name.as_str()).or_default();
            *entry = entry.saturating_add(call.call_count);
        }
        totals
            .into_iter()
            .map(|(name, call_count)| ToolCallInfo {
                name: name.to_string(),
                call_count,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.token_usage == 0
            && self.estimated_cost == 0.0
            && self.turns == 0
            && self.tool_calls.is_empty()
            && self.tool_sequences.is_empty()
    }
}

/// Per-file tool accounting used by the parsers.
///
/// Counts are kept in first-seen order; a sequence is one reasoning episode's
/// ordered tool names and is flushed when the parser sees an episode boundary.
#[derive(Debug, Default)]
pub(crate) struct ToolTracker {
    counts: Vec<ToolCallInfo>,
    index: HashMap<String, usize>,
    current: Vec<String>,
    sequences: Vec<Vec<String>>,
}

impl ToolTracker {
    pub(crate) fn record(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        match self.index.get(name) {
            Some(&slot) => self.counts[slot].call_count += 1,
            None => {
                self.index.insert(name.to_string(), self.counts.len());
                self.counts.push(ToolCallInfo {
                    name: name.to_string(),
                    call_count: 1,
                });
            }
        }
        self.current.push(name.to_string());
    }

    pub(crate) fn end_episode(&mut self) {
        if !self.current.is_empty() {
            self.sequences.push(std::mem::take(&mut self.current));
        }
    }

    pub(crate) fn finish_into(mut self, metrics: &mut LogMetrics) {
        self.end_episode();
        metrics.tool_calls = self.counts;
        metrics.tool_sequences = self.sequences;
    }
}
