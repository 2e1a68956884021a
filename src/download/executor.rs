use super::analysis::analyze_run_dir;
use super::pool::{TaskOutcome, TaskPool};
use super::CancelToken;
use crate::artifacts::artifact_inventory;
use crate::cache::{CacheLookup, RunCache};
use crate::remote::ArtifactFetcher;
use crate::run::{run_dir_for, DownloadResult, RunDescriptor, RunSummary};
use crate::shared::PipelineLog;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fetches, analyzes and caches runs under a bounded worker pool.
#[derive(Clone)]
pub struct DownloadExecutor {
    fetcher: Arc<dyn ArtifactFetcher>,
    cache: RunCache,
    output_dir: PathBuf,
    max_concurrency: usize,
    log: PipelineLog,
    progress: Arc<AtomicUsize>,
}

impl DownloadExecutor {
    pub fn new(
        fetcher: Arc<dyn ArtifactFetcher>,
        cache: RunCache,
        output_dir: impl Into<PathBuf>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            cache,
            output_dir: output_dir.into(),
            max_concurrency,
            log: PipelineLog::disabled(),
            progress: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_log(mut self, log: PipelineLog) -> Self {
        self.log = log;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn cache(&self) -> &RunCache {
        &self.cache
    }

    /// Runs processed so far, across every call on this executor.
    pub fn completed(&self) -> usize {
        self.progress.load(Ordering::SeqCst)
    }

    /// Processes `runs` in parallel and returns their results in input order.
    ///
    /// After cancellation the returned list only holds runs that finished.
    pub fn download_runs(
        &self,
        runs: Vec<RunDescriptor>,
        cancel: &CancelToken,
    ) -> Vec<DownloadResult> {
        if runs.is_empty() {
            return Vec::new();
        }
        let pool = TaskPool::with_progress(self.max_concurrency, Arc::clone(&self.progress));
        let worker = self.clone();
        let report = pool.run(runs.clone(), cancel, move |token, run| {
            worker.process_run(run, token)
        });
        if report.cancelled {
            self.log.info(
                "download.cancelled",
                &format!(
                    "cancelled with {} of {} runs finished",
                    report.outcomes.len(),
                    runs.len()
                ),
            );
        }

        report
            .outcomes
            .into_iter()
            .map(|(index, outcome)| match outcome {
                TaskOutcome::Completed(result) => result,
                TaskOutcome::Panicked(message) => {
                    let run = runs[index].clone();
                    self.log.warn(
                        "run.panicked",
                        &format!("run {} processing panicked: {message}", run.id),
                    );
                    let run_dir = run_dir_for(&self.output_dir, run.id);
                    DownloadResult::errored(run, run_dir, format!("processing panicked: {message}"))
                }
            })
            .collect()
    }

    pub fn process_run(&self, run: RunDescriptor, cancel: &CancelToken) -> DownloadResult {
        let run_dir = run_dir_for(&self.output_dir, run.id);
        if cancel.is_cancelled() {
            return DownloadResult::cancelled(run, run_dir);
        }

        match self.cache.lookup(&run_dir) {
            CacheLookup::Valid(summary) => {
                self.log
                    .debug("run.cache_hit", &format!("run {} served from cache", run.id));
                // Labels and conclusion come from the current listing.
                let mut result = DownloadResult::from_summary(*summary, run_dir);
                result.run = run;
                return result;
            }
            CacheLookup::VersionMismatch { found } => self.log.debug(
                "run.cache_stale",
                &format!(
                    "run {} summary written by {found}, current {}",
                    run.id,
                    self.cache.pipeline_version()
                ),
            ),
            CacheLookup::Unreadable(reason) => self.log.debug(
                "run.cache_unreadable",
                &format!("run {} summary ignored: {reason}", run.id),
            ),
            CacheLookup::Missing => {}
        }

        let mut warnings = Vec::new();
        match self.fetcher.download_artifacts(run.id, &run_dir) {
            Ok(()) => {}
            Err(err) if err.is_no_artifacts() => {
                if !run.concluded_with_failure() {
                    self.log.debug(
                        "run.skipped",
                        &format!("run {} skipped: no artifacts", run.id),
                    );
                    return DownloadResult::skipped(run, run_dir, "no artifacts");
                }
                warnings.push(format!(
                    "no artifacts; run concluded with `{}`",
                    run.conclusion
                ));
            }
            Err(err) => {
                self.log.warn(
                    "run.download_failed",
                    &format!("run {} download failed: {err}", run.id),
                );
                return DownloadResult::errored(run, run_dir, err.to_string());
            }
        }

        if cancel.is_cancelled() {
            return DownloadResult::cancelled(run, run_dir);
        }

        let analysis = analyze_run_dir(&run, &run_dir);
        for warning in &analysis.warnings {
            self.log
                .debug("run.extractor_failed", &format!("run {}: {warning}", run.id));
        }
        warnings.extend(analysis.warnings);

        let job_failures = if run.concluded_with_failure() {
            match self.fetcher.failed_jobs(run.id) {
                Ok(jobs) => u32::try_from(jobs.len().max(1)).unwrap_or(u32::MAX),
                Err(err) => {
                    warnings.push(format!("failed jobs unavailable: {err}"));
                    1
                }
            }
        } else {
            0
        };

        let summary = RunSummary {
            pipeline_version: self.cache.pipeline_version().to_string(),
            run_id: run.id,
            processed_at: Utc::now(),
            run,
            metrics: analysis.metrics,
            metadata: analysis.metadata,
            engine: analysis.engine,
            missing_tools: analysis.missing_tools,
            missing_data: analysis.missing_data,
            noops: analysis.noops,
            mcp_failures: analysis.mcp_failures,
            safe_output_types: analysis.safe_output_types,
            job_failures,
            artifacts: artifact_inventory(&run_dir),
        };
        if let Err(err) = self.cache.store(&run_dir, &summary) {
            self.log.warn(
                "run.cache_store_failed",
                &format!("run {}: {err}", summary.run_id),
            );
            warnings.push(err.to_string());
        }

        let mut result = DownloadResult::from_summary(summary, run_dir);
        result.cached = false;
        result.warnings = warnings;
        result
    }
}
