use crate::artifacts::{load_engine_metadata, ArtifactKind, ArtifactResolver, EngineMetadata};
use crate::extract::{
    extract_mcp_failures, extract_missing_data, extract_missing_tools, extract_noops,
    load_safe_output_items, safe_output_types, McpFailureReport, MissingDataReport,
    MissingToolReport, NoopReport,
};
use crate::metrics::{
    aggregate_run_metrics, select_engine, DetectionContext, EngineKind, LogMetrics,
    SelectionSource,
};
use crate::run::RunDescriptor;
use std::fs;
use std::io::Read;
use std::path::Path;

const LOG_EXCERPT_BYTES: u64 = 64 * 1024;

/// Everything derived from one run's downloaded artifacts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunAnalysis {
    pub metadata: Option<EngineMetadata>,
    pub engine: Option<EngineKind>,
    pub metrics: LogMetrics,
    pub missing_tools: Vec<MissingToolReport>,
    pub missing_data: Vec<MissingDataReport>,
    pub noops: Vec<NoopReport>,
    pub mcp_failures: Vec<McpFailureReport>,
    pub safe_output_types: Vec<String>,
    /// Extractor failures; each failed extractor contributes empty results.
    pub warnings: Vec<String>,
}

fn read_excerpt(path: &Path) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    fs::File::open(path)?
        .take(LOG_EXCERPT_BYTES)
        .read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Runs metadata loading, engine selection, metrics aggregation and the
/// auxiliary extractors over `run_dir`. Never fails as a whole.
pub fn analyze_run_dir(run: &RunDescriptor, run_dir: &Path) -> RunAnalysis {
    let resolver = ArtifactResolver::new(run_dir);
    let mut analysis = RunAnalysis::default();

    if let Some(found) = resolver.resolve(ArtifactKind::EngineMetadata) {
        match load_engine_metadata(&found.path) {
            Ok(metadata) => analysis.metadata = Some(metadata),
            Err(err) => analysis.warnings.push(format!("engine metadata: {err}")),
        }
    }

    let needs_heuristics = analysis
        .metadata
        .as_ref()
        .and_then(EngineMetadata::engine)
        .is_none();
    let excerpt = if needs_heuristics {
        resolver
            .resolve(ArtifactKind::AgentLog)
            .and_then(|found| read_excerpt(&found.path).ok())
    } else {
        None
    };
    let selection = select_engine(
        analysis.metadata.as_ref(),
        &DetectionContext {
            run: Some(run),
            run_dir: Some(run_dir),
            log_excerpt: excerpt.as_deref(),
        },
    );
    if let SelectionSource::Heuristic(probe) = selection.source {
        tracing::debug!(run_id = run.id, probe, "hosted agent detected");
    }
    analysis.engine = Some(selection.engine);

    let aggregated = aggregate_run_metrics(run_dir, selection.engine);
    analysis.metrics = aggregated.metrics;
    analysis.warnings.extend(aggregated.warnings);

    if let Some(found) = resolver.resolve(ArtifactKind::StructuredOutput) {
        match load_safe_output_items(&found.path) {
            Ok(items) => {
                analysis.safe_output_types = safe_output_types(&items);
                analysis.missing_tools = extract_missing_tools(&items);
                analysis.missing_data = extract_missing_data(&items);
                analysis.noops = extract_noops(&items);
            }
            Err(err) => analysis.warnings.push(format!("structured output: {err}")),
        }
    }

    if let Some(found) = resolver.resolve_engine_log(selection.engine) {
        match fs::read(&found.path) {
            Ok(bytes) => {
                analysis.mcp_failures = extract_mcp_failures(&String::from_utf8_lossy(&bytes));
            }
            Err(err) => analysis
                .warnings
                .push(format!("agent log {}: {err}", found.path.display())),
        }
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn run() -> RunDescriptor {
        RunDescriptor {
            id: 9,
            workflow_name: "triage".to_string(),
            workflow_path: ".github/workflows/triage.lock.yml".to_string(),
            status: "completed".to_string(),
            conclusion: "success".to_string(),
            head_branch: "main".to_string(),
            event: "issues".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            html_url: String::new(),
            labels: Vec::new(),
        }
    }

    #[test]
    fn corrupt_structured_output_only_empties_its_own_extractors() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("aw_info.json"), r#"{"engine_id":"claude"}"#)
            .expect("write metadata");
        fs::write(
            dir.path().join("agent-stdio.log"),
            r#"[{"type":"system","subtype":"init","mcp_servers":[{"name":"github","status":"failed"}]},{"type":"result","num_turns":2,"usage":{"input_tokens":30,"output_tokens":12}}]"#,
        )
        .expect("write log");
        fs::write(dir.path().join("agent_output.json"), "{\"items\": [").expect("write output");

        let analysis = analyze_run_dir(&run(), dir.path());
        assert_eq!(analysis.engine, Some(EngineKind::Claude));
        assert_eq!(analysis.metrics.turns, 2);
        assert_eq!(analysis.metrics.token_usage, 42);
        assert_eq!(analysis.mcp_failures.len(), 1);
        assert!(analysis.safe_output_types.is_empty());
        assert_eq!(analysis.warnings.len(), 1);
        assert!(analysis.warnings[0].starts_with("structured output"));
    }

    #[test]
    fn empty_directory_yields_generic_engine_and_zeroed_metrics() {
        let dir = tempdir().expect("tempdir");
        let analysis = analyze_run_dir(&run(), dir.path());
        assert_eq!(analysis.engine, Some(EngineKind::Generic));
        assert!(analysis.metrics.is_empty());
        assert!(analysis.warnings.is_empty());
    }
}
