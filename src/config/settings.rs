use super::concurrency::{is_valid_concurrency, max_concurrency_from_env};
use super::paths::DEFAULT_OUTPUT_DIR;
use super::ConfigError;
use crate::shared::logging::pipeline_log_path;
use crate::shared::PipelineLog;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub max_concurrent_downloads: Option<usize>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_true")]
    pub log_to_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            repository: None,
            api_base: None,
            max_concurrent_downloads: None,
            verbose: false,
            log_to_file: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_true() -> bool {
    true
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads settings from `path` when it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let settings = Self::from_path(path)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Settings(
                "`output_dir` must be non-empty".to_string(),
            ));
        }
        if let Some(repository) = &self.repository {
            parse_repository(repository).map_err(ConfigError::Settings)?;
        }
        if let Some(api_base) = &self.api_base {
            let trimmed = api_base.trim();
            if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                return Err(ConfigError::Settings(
                    "`api_base` must be an http(s) url".to_string(),
                ));
            }
        }
        if let Some(value) = self.max_concurrent_downloads {
            if !is_valid_concurrency(value) {
                return Err(ConfigError::Settings(format!(
                    "`max_concurrent_downloads` must be between 1 and 100, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn max_concurrency(&self) -> usize {
        max_concurrency_from_env(self.max_concurrent_downloads)
    }

    pub fn api_base(&self) -> String {
        std::env::var("RUNSCOPE_GITHUB_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_base.clone())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string())
    }

    pub fn pipeline_log(&self) -> PipelineLog {
        let file = self
            .log_to_file
            .then(|| pipeline_log_path(&self.output_dir));
        PipelineLog::new(file, self.verbose)
    }
}

/// Splits an `owner/name` repository slug.
pub fn parse_repository(raw: &str) -> Result<(String, String), String> {
    let trimmed = raw.trim();
    let Some((owner, name)) = trimmed.split_once('/') else {
        return Err(format!("repository `{trimmed}` must look like `owner/name`"));
    };
    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
    };
    if !valid_part(owner) || !valid_part(name) {
        return Err(format!("repository `{trimmed}` must look like `owner/name`"));
    }
    Ok((owner.to_string(), name.to_string()))
}
