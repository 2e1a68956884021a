use super::continuation::{build_continuation, ContinuationData};
use super::{LogsQuery, PipelineError};
use crate::download::{CancelToken, DownloadExecutor};
use crate::filter::{FilterDecision, FilterPipeline};
use crate::remote::{ListRunsRequest, RunLister};
use crate::run::{DownloadResult, RunDescriptor};
use crate::shared::PipelineLog;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const MAX_ITERATIONS: usize = 20;
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Listing every workflow keeps only agentic runs, so pages are larger.
pub const ALL_WORKFLOWS_BATCH_SIZE: usize = 250;
pub const MAX_BATCH_SIZE: usize = 250;
pub const OVER_FETCH_FACTOR: usize = 3;

/// Batch size for the next listing call.
///
/// Count-limited queries that need less than a full batch over-fetch
/// `remaining × 3` to absorb runs later rejected by filters.
pub fn adaptive_batch_size(fetch_all_in_range: bool, remaining: usize, all_workflows: bool) -> usize {
    let default = if all_workflows {
        ALL_WORKFLOWS_BATCH_SIZE
    } else {
        DEFAULT_BATCH_SIZE
    };
    if fetch_all_in_range || remaining >= default {
        return default;
    }
    remaining
        .saturating_mul(OVER_FETCH_FACTOR)
        .clamp(1, MAX_BATCH_SIZE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub run_id: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    /// Accepted runs in listing order, at most `count`.
    pub runs: Vec<DownloadResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation: Option<ContinuationData>,
    pub timed_out: bool,
    pub iterations: usize,
    pub total_processed: usize,
    /// Skip, error and filter reasons for runs that were not accepted.
    pub rejections: Vec<Rejection>,
}

/// Drives listing, download and filtering until enough runs are accepted or
/// the remote range is exhausted.
pub struct PaginationController {
    lister: Arc<dyn RunLister>,
    executor: DownloadExecutor,
    log: PipelineLog,
    now: Option<DateTime<Utc>>,
}

impl PaginationController {
    pub fn new(lister: Arc<dyn RunLister>, executor: DownloadExecutor) -> Self {
        Self {
            lister,
            executor,
            log: PipelineLog::disabled(),
            now: None,
        }
    }

    pub fn with_log(mut self, log: PipelineLog) -> Self {
        self.log = log;
        self
    }

    /// Fixes the clock used to resolve relative dates.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn executor(&self) -> &DownloadExecutor {
        &self.executor
    }

    pub fn run(
        &self,
        query: &LogsQuery,
        cancel: &CancelToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let date_range = query.resolve_date_range(self.now.unwrap_or_else(Utc::now))?;
        let output_dir = self.executor.output_dir();
        fs::create_dir_all(output_dir).map_err(|source| PipelineError::Io {
            path: output_dir.display().to_string(),
            source,
        })?;

        let fetch_all_in_range = date_range.is_bounded();
        let all_workflows = query.lists_all_workflows();
        let deadline = query
            .timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        let filters = FilterPipeline::new(query.filters.clone());

        let mut accepted: Vec<DownloadResult> = Vec::new();
        let mut rejections = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();
        let mut cursor: Option<DateTime<Utc>> = None;
        let mut iterations = 0usize;
        let mut total_processed = 0usize;
        let mut timed_out = false;

        while iterations < MAX_ITERATIONS {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            if !fetch_all_in_range && accepted.len() >= query.count {
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                timed_out = true;
                self.log.info(
                    "pagination.timeout",
                    &format!("timeout reached with {} runs accepted", accepted.len()),
                );
                break;
            }

            let remaining = query.count.saturating_sub(accepted.len());
            let batch_size = adaptive_batch_size(fetch_all_in_range, remaining, all_workflows);
            let request = ListRunsRequest {
                workflow_name: query.workflow_name.clone(),
                limit: batch_size,
                date_range,
                before_date: cursor,
                git_ref: query.git_ref.clone(),
                before_run_id: query.before_run_id,
                after_run_id: query.after_run_id,
                resolve_labels: query.filters.needs_labels(),
            };
            let batch = match self.lister.list_runs(&request) {
                Ok(batch) => batch,
                Err(err) => {
                    self.log
                        .warn("pagination.listing_failed", &format!("listing runs failed: {err}"));
                    return Err(PipelineError::Listing(err));
                }
            };
            iterations += 1;
            self.log.info(
                "pagination.batch",
                &format!(
                    "iteration {iterations}: {} raw runs, {} candidates (batch size {batch_size})",
                    batch.total_fetched,
                    batch.runs.len()
                ),
            );

            if batch.total_fetched == 0 {
                break;
            }
            let next_cursor = batch
                .oldest_created_at
                .or_else(|| batch.runs.iter().map(|run| run.created_at).min());

            let mut candidates: VecDeque<RunDescriptor> = batch
                .runs
                .into_iter()
                .filter(|run| request.id_in_bounds(run.id) && seen.insert(run.id))
                .collect();
            let fresh = candidates.len();

            while !candidates.is_empty() {
                if cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                let chunk_size = if fetch_all_in_range {
                    candidates.len()
                } else {
                    let needed = query.count.saturating_sub(accepted.len());
                    if needed == 0 {
                        break;
                    }
                    needed.saturating_mul(OVER_FETCH_FACTOR)
                };
                let take = chunk_size.min(candidates.len());
                let chunk: Vec<RunDescriptor> = candidates.drain(..take).collect();

                let results = self.executor.download_runs(chunk, cancel);
                if cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                total_processed += results.len();
                self.absorb(results, &filters, &mut accepted, &mut rejections);
            }

            if batch.total_fetched < batch_size {
                break;
            }
            // A full page of already-seen runs at the same cursor cannot advance.
            if fresh == 0 && next_cursor == cursor {
                break;
            }
            match next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if iterations >= MAX_ITERATIONS {
            self.log.info(
                "pagination.iteration_limit",
                &format!("stopped after {MAX_ITERATIONS} iterations"),
            );
        }

        accepted.truncate(query.count);
        let continuation = if timed_out {
            build_continuation(query, &accepted)
        } else {
            None
        };

        Ok(PipelineOutcome {
            runs: accepted,
            continuation,
            timed_out,
            iterations,
            total_processed,
            rejections,
        })
    }

    fn absorb(
        &self,
        results: Vec<DownloadResult>,
        filters: &FilterPipeline,
        accepted: &mut Vec<DownloadResult>,
        rejections: &mut Vec<Rejection>,
    ) {
        for result in results {
            let run_id = result.run.id;
            let reason = if result.is_usable() {
                match filters.evaluate(&result) {
                    FilterDecision::Accept => None,
                    FilterDecision::Reject(reason) => Some(reason),
                }
            } else if result.skipped {
                Some(
                    result
                        .skip_reason
                        .clone()
                        .unwrap_or_else(|| "skipped".to_string()),
                )
            } else {
                Some(format!(
                    "error: {}",
                    result.error.as_deref().unwrap_or("cancelled")
                ))
            };

            match reason {
                None => accepted.push(result),
                Some(reason) => {
                    self.log
                        .debug("run.rejected", &format!("run {run_id}: {reason}"));
                    rejections.push(Rejection { run_id, reason });
                }
            }
        }
    }
}
