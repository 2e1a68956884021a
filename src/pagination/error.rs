use crate::config::ConfigError;
use crate::remote::RemoteError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("listing runs failed: {0}")]
    Listing(#[source] RemoteError),
    #[error("operation cancelled")]
    Cancelled,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
