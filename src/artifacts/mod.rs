pub mod metadata;
pub mod resolver;

pub use metadata::{load_engine_metadata, EngineMetadata, MetadataSteps};
pub use resolver::{
    artifact_inventory, ArtifactKind, ArtifactLayout, ArtifactResolver, CandidateStrategy,
    ResolvedArtifact,
};

pub const ENGINE_METADATA_FILE: &str = "aw_info.json";
pub const STRUCTURED_OUTPUT_FILE: &str = "agent_output.json";
/// Folder the structured output was uploaded under before the flattened layout.
pub const LEGACY_STRUCTURED_OUTPUT_FOLDER: &str = "safe_output.jsonl";
pub const AGENT_LOG_FILE: &str = "agent-stdio.log";
pub const AGENT_OUTPUTS_DIR: &str = "agent_outputs";
pub const PATCH_FILE: &str = "aw.patch";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
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
