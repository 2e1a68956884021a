use crate::run::{RunSummary, RUN_SUMMARY_FILE_NAME};
use crate::shared::atomic_write_file;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
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

/// Result of looking up a run's persisted summary. Only `Valid` may be reused.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Valid(Box<RunSummary>),
    Missing,
    Unreadable(String),
    VersionMismatch { found: String },
}

impl CacheLookup {
    pub fn into_valid(self) -> Option<RunSummary> {
        match self {
            Self::Valid(summary) => Some(*summary),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Per-run summary store gated on the pipeline version that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCache {
    pipeline_version: String,
}

impl RunCache {
    pub fn new(pipeline_version: impl Into<String>) -> Self {
        Self {
            pipeline_version: pipeline_version.into(),
        }
    }

    /// Cache keyed on this build's crate version.
    pub fn current() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }

    pub fn pipeline_version(&self) -> &str {
        &self.pipeline_version
    }

    pub fn summary_path(run_dir: &Path) -> PathBuf {
        run_dir.join(RUN_SUMMARY_FILE_NAME)
    }

    pub fn lookup(&self, run_dir: &Path) -> CacheLookup {
        let path = Self::summary_path(run_dir);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return CacheLookup::Missing,
            Err(err) => return CacheLookup::Unreadable(format!("{}: {err}", path.display())),
        };
        let summary: RunSummary = match serde_json::from_str(&raw) {
            Ok(summary) => summary,
            Err(err) => return CacheLookup::Unreadable(format!("{}: {err}", path.display())),
        };
        if summary.pipeline_version != self.pipeline_version {
            return CacheLookup::VersionMismatch {
                found: summary.pipeline_version,
            };
        }
        CacheLookup::Valid(Box::new(summary))
    }

    pub fn store(&self, run_dir: &Path, summary: &RunSummary) -> Result<(), CacheError> {
        let path = Self::summary_path(run_dir);
        let body = serde_json::to_vec_pretty(summary).map_err(|source| CacheError::Json {
            path: path.display().to_string(),
            source,
        })?;
        atomic_write_file(&path, &body).map_err(|source| CacheError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
