use super::AnalysisError;
use crate::metrics::EngineKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Contents of a run's `aw_info.json`, written by the workflow when it starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMetadata {
    #[serde(default)]
    pub engine_id: String,
    #[serde(default)]
    pub engine_name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub workflow_name: String,
    #[serde(default)]
    pub staged: bool,
    #[serde(default)]
    pub steps: MetadataSteps,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSteps {
    #[serde(default)]
    pub firewall: String,
}

impl EngineMetadata {
    pub fn firewall_enabled(&self) -> bool {
        !self.steps.firewall.trim().is_empty()
    }

    pub fn engine(&self) -> Option<EngineKind> {
        EngineKind::from_engine_id(&self.engine_id)
    }
}

pub fn load_engine_metadata(path: &Path) -> Result<EngineMetadata, AnalysisError> {
    let raw = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| AnalysisError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn metadata_reads_engine_staged_and_firewall() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("aw_info.json");
        fs::write(
            &path,
            r#"{"engine_id":"copilot","engine_name":"GitHub Copilot CLI","staged":true,"steps":{"firewall":"squid"},"extra":1}"#,
        )
        .expect("write metadata");

        let metadata = load_engine_metadata(&path).expect("load metadata");
        assert_eq!(metadata.engine(), Some(EngineKind::Copilot));
        assert!(metadata.staged);
        assert!(metadata.firewall_enabled());
    }

    #[test]
    fn malformed_metadata_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("aw_info.json");
        fs::write(&path, "{not json").expect("write metadata");

        let err = load_engine_metadata(&path).expect_err("invalid json");
        assert!(err.to_string().contains("aw_info.json"));
    }
}
