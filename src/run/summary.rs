use super::RunDescriptor;
use crate::artifacts::EngineMetadata;
use crate::extract::{McpFailureReport, MissingDataReport, MissingToolReport, NoopReport};
use crate::metrics::{EngineKind, LogMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const RUN_SUMMARY_FILE_NAME: &str = "run_summary.json";

/// Persisted per-run analysis, written next to the run's artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub pipeline_version: String,
    pub run_id: u64,
    pub processed_at: DateTime<Utc>,
    pub run: RunDescriptor,
    #[serde(default)]
    pub metrics: LogMetrics,
    #[serde(default)]
    pub metadata: Option<EngineMetadata>,
    #[serde(default)]
    pub engine: Option<EngineKind>,
    #[serde(default)]
    pub missing_tools: Vec<MissingToolReport>,
    #[serde(default)]
    pub missing_data: Vec<MissingDataReport>,
    #[serde(default)]
    pub noops: Vec<NoopReport>,
    #[serde(default)]
    pub mcp_failures: Vec<McpFailureReport>,
    #[serde(default)]
    pub safe_output_types: Vec<String>,
    #[serde(default)]
    pub job_failures: u32,
    #[serde(default)]
    pub artifacts: Vec<String>,
}
