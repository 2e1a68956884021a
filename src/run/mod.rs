use crate::artifacts::EngineMetadata;
use crate::extract::{McpFailureReport, MissingDataReport, MissingToolReport, NoopReport};
use crate::metrics::{EngineKind, LogMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod summary;

pub use summary::{RunSummary, RUN_SUMMARY_FILE_NAME};

const FAILURE_CONCLUSIONS: [&str; 3] = ["failure", "timed_out", "cancelled"];

/// One remote workflow run as reported by the listing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDescriptor {
    pub id: u64,
    pub workflow_name: String,
    #[serde(default)]
    pub workflow_path: String,
    pub status: String,
    #[serde(default)]
    pub conclusion: String,
    #[serde(default)]
    pub head_branch: String,
    #[serde(default)]
    pub event: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl RunDescriptor {
    /// Failure, timeout and cancellation runs are kept even without artifacts.
    pub fn concluded_with_failure(&self) -> bool {
        FAILURE_CONCLUSIONS.contains(&self.conclusion.as_str())
    }
}

pub fn run_dir_name(run_id: u64) -> String {
    format!("run-{run_id}")
}

pub fn run_dir_for(output_dir: &Path, run_id: u64) -> PathBuf {
    output_dir.join(run_dir_name(run_id))
}

/// Outcome of processing a single run, fresh or from the summary cache.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    pub run: RunDescriptor,
    pub run_dir: PathBuf,
    pub metrics: LogMetrics,
    pub metadata: Option<EngineMetadata>,
    pub engine: Option<EngineKind>,
    pub missing_tools: Vec<MissingToolReport>,
    pub missing_data: Vec<MissingDataReport>,
    pub noops: Vec<NoopReport>,
    pub mcp_failures: Vec<McpFailureReport>,
    pub safe_output_types: Vec<String>,
    pub job_failures: u32,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub error: Option<String>,
    pub cancelled: bool,
    pub cached: bool,
    pub warnings: Vec<String>,
}

impl DownloadResult {
    pub fn empty(run: RunDescriptor, run_dir: PathBuf) -> Self {
        Self {
            run,
            run_dir,
            metrics: LogMetrics::default(),
            metadata: None,
            engine: None,
            missing_tools: Vec::new(),
            missing_data: Vec::new(),
            noops: Vec::new(),
            mcp_failures: Vec::new(),
            safe_output_types: Vec::new(),
            job_failures: 0,
            skipped: false,
            skip_reason: None,
            error: None,
            cancelled: false,
            cached: false,
            warnings: Vec::new(),
        }
    }

    pub fn skipped(run: RunDescriptor, run_dir: PathBuf, reason: impl Into<String>) -> Self {
        let mut result = Self::empty(run, run_dir);
        result.skipped = true;
        result.skip_reason = Some(reason.into());
        result
    }

    pub fn errored(run: RunDescriptor, run_dir: PathBuf, error: impl Into<String>) -> Self {
        let mut result = Self::empty(run, run_dir);
        result.error = Some(error.into());
        result
    }

    pub fn cancelled(run: RunDescriptor, run_dir: PathBuf) -> Self {
        let mut result = Self::empty(run, run_dir);
        result.cancelled = true;
        result.error = Some("cancelled".to_string());
        result
    }

    pub fn from_summary(summary: RunSummary, run_dir: PathBuf) -> Self {
        Self {
            run: summary.run,
            run_dir,
            metrics: summary.metrics,
            metadata: summary.metadata,
            engine: summary.engine,
            missing_tools: summary.missing_tools,
            missing_data: summary.missing_data,
            noops: summary.noops,
            mcp_failures: summary.mcp_failures,
            safe_output_types: summary.safe_output_types,
            job_failures: summary.job_failures,
            skipped: false,
            skip_reason: None,
            error: None,
            cancelled: false,
            cached: true,
            warnings: Vec::new(),
        }
    }

    /// Only results that processed without skip, error or cancellation can be accepted.
    pub fn is_usable(&self) -> bool {
        !self.skipped && !self.cancelled && self.error.is_none()
    }
}
