use super::time::now_secs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn pipeline_log_path(output_dir: &Path) -> PathBuf {
    output_dir.join("logs/pipeline.log")
}

pub fn append_pipeline_log(path: &Path, level: &str, event: &str, message: &str) {
    let payload = serde_json::json!({
        "timestamp": now_secs(),
        "level": level,
        "event": event,
        "message": message,
    });

    let Ok(line) = serde_json::to_string(&payload) else {
        return;
    };

    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = writeln!(file, "{line}");
}

/// Diagnostics sink shared by the pipeline stages.
///
/// Every event goes to `tracing`; when a file path is configured the event is
/// also appended to the JSON-lines pipeline log.
#[derive(Debug, Clone, Default)]
pub struct PipelineLog {
    file: Option<PathBuf>,
    verbose: bool,
}

impl PipelineLog {
    pub fn new(file: Option<PathBuf>, verbose: bool) -> Self {
        Self { file, verbose }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn info(&self, event: &str, message: &str) {
        tracing::info!(event = %event, "{message}");
        self.append("info", event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        tracing::warn!(event = %event, "{message}");
        self.append("warn", event, message);
    }

    /// Verbose-only diagnostics such as per-run skip and reject reasons.
    pub fn debug(&self, event: &str, message: &str) {
        tracing::debug!(event = %event, "{message}");
        if self.verbose {
            self.append("debug", event, message);
        }
    }

    fn append(&self, level: &str, event: &str, message: &str) {
        if let Some(path) = &self.file {
            append_pipeline_log(path, level, event, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn pipeline_log_appends_json_lines_and_gates_debug_on_verbose() {
        let dir = tempdir().expect("tempdir");
        let path = pipeline_log_path(dir.path());

        let quiet = PipelineLog::new(Some(path.clone()), false);
        quiet.info("batch.fetched", "fetched 3 runs");
        quiet.debug("run.rejected", "hidden");

        let loud = PipelineLog::new(Some(path.clone()), true);
        loud.debug("run.rejected", "engine mismatch");

        let raw = fs::read_to_string(&path).expect("read log");
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "batch.fetched");
        assert_eq!(lines[1]["level"], "debug");
        assert_eq!(lines[1]["message"], "engine mismatch");
    }
}
