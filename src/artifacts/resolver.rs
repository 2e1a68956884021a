use super::{
    AGENT_LOG_FILE, ENGINE_METADATA_FILE, LEGACY_STRUCTURED_OUTPUT_FOLDER,
    STRUCTURED_OUTPUT_FILE,
};
use crate::metrics::engine::LogLocation;
use crate::metrics::{is_log_file, EngineKind};
use crate::run::RUN_SUMMARY_FILE_NAME;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    EngineMetadata,
    StructuredOutput,
    AgentLog,
}

/// Which historical layout a resolved artifact was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactLayout {
    Flattened,
    Nested,
    FolderSingleFile,
    Searched,
    EngineOutputDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub path: PathBuf,
    pub layout: ArtifactLayout,
}

/// One way of locating an artifact inside a run directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStrategy {
    /// `<run>/<file>`
    RootFile(&'static str),
    /// `<run>/<folder>/<file>`
    NestedFile {
        folder: &'static str,
        file: &'static str,
    },
    /// `<run>/<folder>` holding exactly one file, whatever its name.
    FolderSingleFile(&'static str),
    /// Depth-first search for any file with one of these names.
    RecursiveSearch(&'static [&'static str]),
}

const AGENT_LOG_NAMES: &[&str] = &[AGENT_LOG_FILE, "agent_stdio.log", "agent.log"];

const ENGINE_METADATA_CANDIDATES: &[CandidateStrategy] = &[
    CandidateStrategy::RootFile(ENGINE_METADATA_FILE),
    CandidateStrategy::NestedFile {
        folder: ENGINE_METADATA_FILE,
        file: ENGINE_METADATA_FILE,
    },
    CandidateStrategy::NestedFile {
        folder: "aw_info",
        file: ENGINE_METADATA_FILE,
    },
    CandidateStrategy::FolderSingleFile(ENGINE_METADATA_FILE),
];

const STRUCTURED_OUTPUT_CANDIDATES: &[CandidateStrategy] = &[
    CandidateStrategy::RootFile(STRUCTURED_OUTPUT_FILE),
    CandidateStrategy::NestedFile {
        folder: STRUCTURED_OUTPUT_FILE,
        file: STRUCTURED_OUTPUT_FILE,
    },
    CandidateStrategy::NestedFile {
        folder: LEGACY_STRUCTURED_OUTPUT_FOLDER,
        file: STRUCTURED_OUTPUT_FILE,
    },
    CandidateStrategy::FolderSingleFile(LEGACY_STRUCTURED_OUTPUT_FOLDER),
    CandidateStrategy::RootFile(LEGACY_STRUCTURED_OUTPUT_FOLDER),
];

const AGENT_LOG_CANDIDATES: &[CandidateStrategy] = &[
    CandidateStrategy::RootFile(AGENT_LOG_FILE),
    CandidateStrategy::NestedFile {
        folder: AGENT_LOG_FILE,
        file: AGENT_LOG_FILE,
    },
    CandidateStrategy::FolderSingleFile(AGENT_LOG_FILE),
    CandidateStrategy::RecursiveSearch(AGENT_LOG_NAMES),
];

impl ArtifactKind {
    /// Candidate strategies in priority order.
    pub fn candidates(self) -> &'static [CandidateStrategy] {
        match self {
            Self::EngineMetadata => ENGINE_METADATA_CANDIDATES,
            Self::StructuredOutput => STRUCTURED_OUTPUT_CANDIDATES,
            Self::AgentLog => AGENT_LOG_CANDIDATES,
        }
    }
}

/// Locates well-known artifacts inside one run directory.
///
/// A miss is reported as `None`; callers treat it as "artifact absent".
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    run_dir: PathBuf,
}

impl ArtifactResolver {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn resolve(&self, kind: ArtifactKind) -> Option<ResolvedArtifact> {
        kind.candidates()
            .iter()
            .find_map(|strategy| self.try_strategy(*strategy))
    }

    fn try_strategy(&self, strategy: CandidateStrategy) -> Option<ResolvedArtifact> {
        match strategy {
            CandidateStrategy::RootFile(file) => {
                let path = self.run_dir.join(file);
                path.is_file().then_some(ResolvedArtifact {
                    path,
                    layout: ArtifactLayout::Flattened,
                })
            }
            CandidateStrategy::NestedFile { folder, file } => {
                let path = self.run_dir.join(folder).join(file);
                path.is_file().then_some(ResolvedArtifact {
                    path,
                    layout: ArtifactLayout::Nested,
                })
            }
            CandidateStrategy::FolderSingleFile(folder) => {
                let folder = self.run_dir.join(folder);
                if !folder.is_dir() {
                    return None;
                }
                let files: Vec<PathBuf> = fs::read_dir(&folder)
                    .ok()?
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|path| path.is_file())
                    .collect();
                match files.as_slice() {
                    [only] => Some(ResolvedArtifact {
                        path: only.clone(),
                        layout: ArtifactLayout::FolderSingleFile,
                    }),
                    _ => None,
                }
            }
            CandidateStrategy::RecursiveSearch(names) => WalkDir::new(&self.run_dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .find(|entry| {
                    let name = entry.file_name().to_string_lossy();
                    names.iter().any(|candidate| name.eq_ignore_ascii_case(candidate))
                })
                .map(|entry| ResolvedArtifact {
                    path: entry.into_path(),
                    layout: ArtifactLayout::Searched,
                }),
        }
    }

    /// Resolves the conversation log for a specific engine.
    ///
    /// Engines that log to stdio use the generic agent log. Others are looked
    /// up in their output directory first, then by their file naming
    /// convention anywhere in the run, and finally fall back to the stdio log.
    pub fn resolve_engine_log(&self, engine: EngineKind) -> Option<ResolvedArtifact> {
        let LogLocation::OutputDir { dir, name_prefixes } = engine.log_location() else {
            return self.resolve(ArtifactKind::AgentLog);
        };

        let output_dir = self.run_dir.join(dir);
        if output_dir.is_dir() {
            let found = WalkDir::new(&output_dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .find(|entry| is_log_file(&entry.file_name().to_string_lossy()));
            if let Some(entry) = found {
                return Some(ResolvedArtifact {
                    path: entry.into_path(),
                    layout: ArtifactLayout::EngineOutputDir,
                });
            }
        }

        let by_name = WalkDir::new(&self.run_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .find(|entry| {
                let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
                name_prefixes.iter().any(|prefix| name.starts_with(prefix))
            });
        if let Some(entry) = by_name {
            return Some(ResolvedArtifact {
                path: entry.into_path(),
                layout: ArtifactLayout::Searched,
            });
        }

        self.resolve(ArtifactKind::AgentLog)
    }
}

/// Relative paths of every file in the run directory except the run summary.
pub fn artifact_inventory(run_dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(run_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(run_dir).ok()?;
            let relative = relative.to_string_lossy().replace('\\', "/");
            (relative != RUN_SUMMARY_FILE_NAME).then_some(relative)
        })
        .collect();
    files.sort();
    files
}
