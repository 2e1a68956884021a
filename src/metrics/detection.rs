//! Engine selection for a downloaded run.
//!
//! Metadata from `aw_info.json` always wins. When it is missing or names an
//! unknown engine, a fixed ordered list of probes decides whether the run came
//! from the hosted coding agent; otherwise the generic parser is used.

use super::EngineKind;
use crate::artifacts::EngineMetadata;
use crate::run::RunDescriptor;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Evidence available to the probes. Every field is optional so probes can
/// run before, during, or after artifact download.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionContext<'a> {
    pub run: Option<&'a RunDescriptor>,
    pub run_dir: Option<&'a Path>,
    pub log_excerpt: Option<&'a str>,
}

pub trait AgentProbe: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, ctx: &DetectionContext<'_>) -> bool;
}

const AGENT_WORKFLOW_NAMES: [&str; 2] = ["copilot-swe-agent", "copilot-swe-agent.yml"];

pub struct WorkflowPathProbe;

impl AgentProbe for WorkflowPathProbe {
    fn name(&self) -> &'static str {
        "workflow_path"
    }

    fn matches(&self, ctx: &DetectionContext<'_>) -> bool {
        let Some(run) = ctx.run else {
            return false;
        };
        let basename = run
            .workflow_path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        AGENT_WORKFLOW_NAMES.contains(&basename.as_str())
    }
}

fn agent_log_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)copilot[-_ ]swe[-_ ]agent|github copilot coding agent|@github/copilot-agent")
            .expect("valid agent log regex")
    })
}

pub struct LogContentProbe;

impl AgentProbe for LogContentProbe {
    fn name(&self) -> &'static str {
        "log_content"
    }

    fn matches(&self, ctx: &DetectionContext<'_>) -> bool {
        ctx.log_excerpt
            .map(|excerpt| agent_log_re().is_match(excerpt))
            .unwrap_or(false)
    }
}

const AGENT_ARTIFACT_MARKERS: [&str; 2] = ["copilot-agent", "copilot_agent"];

pub struct ArtifactNameProbe;

impl AgentProbe for ArtifactNameProbe {
    fn name(&self) -> &'static str {
        "artifact_name"
    }

    fn matches(&self, ctx: &DetectionContext<'_>) -> bool {
        let Some(run_dir) = ctx.run_dir else {
            return false;
        };
        WalkDir::new(run_dir)
            .max_depth(3)
            .into_iter()
            .filter_map(Result::ok)
            .any(|entry| {
                let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
                AGENT_ARTIFACT_MARKERS
                    .iter()
                    .any(|marker| name.contains(marker))
            })
    }
}

/// Probes in evaluation order; the first match decides.
pub fn default_probes() -> Vec<Box<dyn AgentProbe>> {
    vec![
        Box::new(WorkflowPathProbe),
        Box::new(LogContentProbe),
        Box::new(ArtifactNameProbe),
    ]
}

/// Name of the first probe that recognizes the hosted agent, if any.
pub fn detect_hosted_agent(
    probes: &[Box<dyn AgentProbe>],
    ctx: &DetectionContext<'_>,
) -> Option<&'static str> {
    probes
        .iter()
        .find(|probe| probe.matches(ctx))
        .map(|probe| probe.name())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Metadata,
    Heuristic(&'static str),
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSelection {
    pub engine: EngineKind,
    pub source: SelectionSource,
}

pub fn select_engine(
    metadata: Option<&EngineMetadata>,
    ctx: &DetectionContext<'_>,
) -> EngineSelection {
    if let Some(engine) = metadata.and_then(EngineMetadata::engine) {
        return EngineSelection {
            engine,
            source: SelectionSource::Metadata,
        };
    }
    match detect_hosted_agent(&default_probes(), ctx) {
        Some(probe) => EngineSelection {
            engine: EngineKind::CopilotAgent,
            source: SelectionSource::Heuristic(probe),
        },
        None => EngineSelection {
            engine: EngineKind::Generic,
            source: SelectionSource::Fallback,
        },
    }
}
