use super::LogsQuery;
use crate::filter::{FirewallFilter, RunFilters};
use crate::run::DownloadResult;
use serde::{Deserialize, Serialize};

const CONTINUATION_MESSAGE: &str =
    "Timeout reached. Run again with these parameters to continue with older runs.";

/// Parameters that resume a timed-out invocation strictly below the oldest
/// run it already returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationData {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(rename = "beforeRunID")]
    pub before_run_id: u64,
    #[serde(
        rename = "afterRunID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub after_run_id: Option<u64>,
    #[serde(default)]
    pub exclude_staged: bool,
    #[serde(default)]
    pub firewall_only: bool,
    #[serde(default)]
    pub no_firewall_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_output_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ContinuationData {
    pub fn into_query(self) -> LogsQuery {
        let firewall = match (self.firewall_only, self.no_firewall_only) {
            (true, false) => FirewallFilter::OnlyWith,
            (false, true) => FirewallFilter::OnlyWithout,
            _ => FirewallFilter::Any,
        };
        LogsQuery {
            workflow_name: self.workflow_name,
            count: self.count,
            start_date: self.start_date,
            end_date: self.end_date,
            git_ref: self.git_ref,
            before_run_id: Some(self.before_run_id),
            after_run_id: self.after_run_id,
            filters: RunFilters {
                engine: self.engine,
                exclude_staged: self.exclude_staged,
                firewall,
                safe_output_type: self.safe_output_type,
                label: self.label,
            },
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Continuation for `query` given the runs accepted so far; `None` when
/// nothing was accepted.
pub fn build_continuation(query: &LogsQuery, accepted: &[DownloadResult]) -> Option<ContinuationData> {
    let oldest = accepted.iter().map(|result| result.run.id).min()?;
    let filters = &query.filters;
    Some(ContinuationData {
        message: CONTINUATION_MESSAGE.to_string(),
        workflow_name: query.workflow_name.clone(),
        count: query.count,
        start_date: query.start_date.clone(),
        end_date: query.end_date.clone(),
        engine: filters.engine.clone(),
        git_ref: query.git_ref.clone(),
        before_run_id: oldest,
        after_run_id: query.after_run_id,
        exclude_staged: filters.exclude_staged,
        firewall_only: filters.firewall == FirewallFilter::OnlyWith,
        no_firewall_only: filters.firewall == FirewallFilter::OnlyWithout,
        safe_output_type: filters.safe_output_type.clone(),
        label: filters.label.clone(),
        timeout_secs: query.timeout_secs,
    })
}
