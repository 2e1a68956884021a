use super::{parser_for, EngineKind, LogMetrics};
use crate::artifacts::{LEGACY_STRUCTURED_OUTPUT_FOLDER, PATCH_FILE, STRUCTURED_OUTPUT_FILE};
use crate::run::RUN_SUMMARY_FILE_NAME;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Output artifacts that share a log-like name but never contain agent logs.
const EXCLUDED_FILE_NAMES: [&str; 5] = [
    STRUCTURED_OUTPUT_FILE,
    LEGACY_STRUCTURED_OUTPUT_FOLDER,
    "aw_output.txt",
    PATCH_FILE,
    RUN_SUMMARY_FILE_NAME,
];

pub fn is_log_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    if EXCLUDED_FILE_NAMES.contains(&lower.as_str()) || lower.ends_with(".patch") {
        return false;
    }
    lower.ends_with(".log") || (lower.ends_with(".txt") && lower.contains("log"))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedMetrics {
    pub metrics: LogMetrics,
    /// Log files that were parsed, relative to the run directory.
    pub files: Vec<PathBuf>,
    /// Files that could not be read; the remaining files still count.
    pub warnings: Vec<String>,
}

/// Parses every log file under `run_dir` with the engine's parser and folds
/// the per-file metrics into one run total.
pub fn aggregate_run_metrics(run_dir: &Path, engine: EngineKind) -> AggregatedMetrics {
    let parser = parser_for(engine);
    let mut aggregated = AggregatedMetrics::default();

    let entries = WalkDir::new(run_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file());

    for entry in entries {
        let name = entry.file_name().to_string_lossy();
        if !is_log_file(&name) {
            continue;
        }
        let path = entry.path();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                aggregated
                    .warnings
                    .push(format!("failed to read {}: {err}", path.display()));
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        aggregated.metrics.merge_file(parser.parse(&content));
        aggregated.files.push(
            path.strip_prefix(run_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf()),
        );
    }

    aggregated
}
