//! Top-level orchestration: paginated listing, parallel download, filtering
//! and timeout continuation.

pub mod continuation;
pub mod controller;
pub mod dates;
pub mod error;
pub mod query;

pub use continuation::{build_continuation, ContinuationData};
pub use controller::{
    adaptive_batch_size, PaginationController, PipelineOutcome, Rejection,
    ALL_WORKFLOWS_BATCH_SIZE, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE, MAX_ITERATIONS,
    OVER_FETCH_FACTOR,
};
pub use dates::resolve_date_bound;
pub use error::PipelineError;
pub use query::LogsQuery;

use crate::cache::RunCache;
use crate::config::Settings;
use crate::download::DownloadExecutor;
use crate::remote::GitHubClient;
use std::sync::Arc;

/// Wires a controller against the GitHub API for the configured repository.
pub fn github_pipeline(settings: &Settings) -> Result<PaginationController, PipelineError> {
    settings.validate()?;
    let client = Arc::new(GitHubClient::from_settings(settings)?);
    let log = settings.pipeline_log();
    let executor = DownloadExecutor::new(
        client.clone(),
        RunCache::current(),
        settings.output_dir.clone(),
        settings.max_concurrency(),
    )
    .with_log(log.clone());
    Ok(PaginationController::new(client, executor).with_log(log))
}
