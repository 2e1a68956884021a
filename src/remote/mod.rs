//! Collaborator interfaces for listing runs and fetching their artifacts.

pub mod archive;
pub mod github;

pub use archive::{extract_zip, flatten_single_file_artifacts, install_artifacts};
pub use github::GitHubClient;

use crate::run::RunDescriptor;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("no artifacts found for run {run_id}")]
    NoArtifacts { run_id: u64 },
    #[error("remote request failed: {0}")]
    Request(String),
    #[error("remote returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("artifact archive error: {0}")]
    Archive(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RemoteError {
    pub fn is_no_artifacts(&self) -> bool {
        matches!(self, Self::NoArtifacts { .. })
    }
}

/// Inclusive creation-date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRunsRequest {
    pub workflow_name: Option<String>,
    pub limit: usize,
    pub date_range: DateRange,
    /// Only runs created at or before this instant; repeats are expected.
    pub before_date: Option<DateTime<Utc>>,
    pub git_ref: Option<String>,
    /// Only runs with an id strictly below this one.
    pub before_run_id: Option<u64>,
    /// Only runs with an id strictly above this one.
    pub after_run_id: Option<u64>,
    pub resolve_labels: bool,
}

impl ListRunsRequest {
    pub fn id_in_bounds(&self, run_id: u64) -> bool {
        self.before_run_id.map_or(true, |before| run_id < before)
            && self.after_run_id.map_or(true, |after| run_id > after)
    }
}

/// One page of listing results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunBatch {
    /// Runs left after client-side filtering, newest first.
    pub runs: Vec<RunDescriptor>,
    /// Raw runs returned by the remote before client-side filtering.
    pub total_fetched: usize,
    /// Oldest creation time in the raw page, used as the next cursor.
    pub oldest_created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub id: u64,
    pub name: String,
    pub conclusion: String,
}

pub trait RunLister: Send + Sync {
    fn list_runs(&self, request: &ListRunsRequest) -> Result<RunBatch, RemoteError>;
}

pub trait ArtifactFetcher: Send + Sync {
    /// Downloads every artifact of the run into `dest`.
    ///
    /// Must fail with [`RemoteError::NoArtifacts`] when the run has none.
    fn download_artifacts(&self, run_id: u64, dest: &Path) -> Result<(), RemoteError>;

    /// Jobs of the run that concluded with a failure.
    fn failed_jobs(&self, _run_id: u64) -> Result<Vec<JobSummary>, RemoteError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_bounds_are_exclusive() {
        let request = ListRunsRequest {
            before_run_id: Some(100),
            after_run_id: Some(10),
            ..ListRunsRequest::default()
        };
        assert!(request.id_in_bounds(99));
        assert!(request.id_in_bounds(11));
        assert!(!request.id_in_bounds(100));
        assert!(!request.id_in_bounds(10));
        assert!(ListRunsRequest::default().id_in_bounds(1));
    }
}
