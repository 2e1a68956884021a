use super::archive::install_artifacts;
use super::{ArtifactFetcher, JobSummary, ListRunsRequest, RemoteError, RunBatch, RunLister};
use crate::config::{parse_repository, ConfigError, Settings};
use crate::run::RunDescriptor;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

const MAX_PER_PAGE: usize = 100;
const AGENTIC_WORKFLOW_SUFFIX: &str = ".lock.yml";
const FAILED_JOB_CONCLUSIONS: [&str; 3] = ["failure", "timed_out", "cancelled"];

/// GitHub Actions REST client for one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsPage {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    path: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    head_branch: Option<String>,
    #[serde(default)]
    event: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    pull_requests: Vec<PullRequestRef>,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct LabelEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArtifactsPage {
    #[serde(default)]
    artifacts: Vec<ArtifactEntry>,
}

#[derive(Debug, Deserialize)]
struct ArtifactEntry {
    name: String,
    archive_download_url: String,
    #[serde(default)]
    expired: bool,
}

#[derive(Debug, Deserialize)]
struct JobsPage {
    #[serde(default)]
    jobs: Vec<JobEntry>,
}

#[derive(Debug, Deserialize)]
struct JobEntry {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    conclusion: Option<String>,
}

impl GitHubClient {
    pub fn new(
        api_base: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            owner: owner.into(),
            repo: repo.into(),
            token,
        }
    }

    /// Builds a client for the configured repository, reading the token from
    /// `GITHUB_TOKEN` or `GH_TOKEN`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let repository = settings.repository.as_deref().ok_or_else(|| {
            ConfigError::Settings("`repository` is required to list runs".to_string())
        })?;
        let (owner, repo) = parse_repository(repository).map_err(ConfigError::Settings)?;
        let token = ["GITHUB_TOKEN", "GH_TOKEN"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.trim().is_empty());
        Ok(Self::new(settings.api_base(), owner, repo, token))
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            path
        )
    }

    fn call(&self, url: &str) -> Result<ureq::Response, RemoteError> {
        let mut request = ureq::get(url)
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request.call().map_err(|err| match err {
            ureq::Error::Status(status, _) => RemoteError::Status {
                status,
                url: url.to_string(),
            },
            ureq::Error::Transport(transport) => RemoteError::Request(transport.to_string()),
        })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let mut url = self.endpoint(path);
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{url}?{encoded}");
        }

        let body = self
            .call(&url)?
            .into_string()
            .map_err(|e| RemoteError::Request(e.to_string()))?;
        serde_json::from_str(&body).map_err(|source| RemoteError::Json { path: url, source })
    }

    fn runs_path(workflow_name: Option<&str>) -> String {
        match workflow_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => {
                let file = if name.ends_with(".yml") || name.ends_with(".yaml") {
                    name.to_string()
                } else {
                    format!("{name}{AGENTIC_WORKFLOW_SUFFIX}")
                };
                format!("actions/workflows/{}/runs", urlencoding::encode(&file))
            }
            None => "actions/runs".to_string(),
        }
    }

    fn labels_for(&self, pull_requests: &[PullRequestRef]) -> Result<Vec<String>, RemoteError> {
        let mut labels = Vec::new();
        for pr in pull_requests {
            let entries: Vec<LabelEntry> =
                self.get_json(&format!("issues/{}/labels", pr.number), &[])?;
            for entry in entries {
                if !labels.contains(&entry.name) {
                    labels.push(entry.name);
                }
            }
        }
        Ok(labels)
    }
}

/// GitHub search qualifier for the creation-time window, if any.
///
/// The `before` cursor is inclusive: runs sharing the cursor's second are
/// listed again and the caller drops the ones it has already seen.
pub fn created_qualifier(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    before: Option<DateTime<Utc>>,
) -> Option<String> {
    let upper = match (before, end) {
        (Some(before), Some(end)) if before.date_naive() <= end => {
            Some(before.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        }
        (Some(before), None) => Some(before.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        (_, Some(end)) => Some(end.format("%Y-%m-%d").to_string()),
        (None, None) => None,
    };
    let start = start.map(|date| date.format("%Y-%m-%d").to_string());
    match (start, upper) {
        (Some(start), Some(upper)) => Some(format!("{start}..{upper}")),
        (Some(start), None) => Some(format!(">={start}")),
        (None, Some(upper)) => Some(format!("<={upper}")),
        (None, None) => None,
    }
}

impl RunLister for GitHubClient {
    fn list_runs(&self, request: &ListRunsRequest) -> Result<RunBatch, RemoteError> {
        let path = Self::runs_path(request.workflow_name.as_deref());
        let created = created_qualifier(
            request.date_range.start,
            request.date_range.end,
            request.before_date,
        );
        let per_page = request.limit.clamp(1, MAX_PER_PAGE);

        let mut raw: Vec<WorkflowRun> = Vec::new();
        let mut page = 1usize;
        while raw.len() < request.limit {
            let mut query = vec![("per_page", per_page.to_string()), ("page", page.to_string())];
            if let Some(created) = &created {
                query.push(("created", created.clone()));
            }
            if let Some(git_ref) = request.git_ref.as_deref().filter(|r| !r.is_empty()) {
                query.push(("branch", git_ref.to_string()));
            }

            let body: WorkflowRunsPage = self.get_json(&path, &query)?;
            let received = body.workflow_runs.len();
            raw.extend(body.workflow_runs);
            if received < per_page {
                break;
            }
            page += 1;
        }
        raw.truncate(request.limit);

        let total_fetched = raw.len();
        let oldest_created_at = raw.iter().map(|run| run.created_at).min();
        let agentic_only = request
            .workflow_name
            .as_deref()
            .map_or(true, |name| name.trim().is_empty());

        let mut runs = Vec::new();
        for run in raw {
            if agentic_only && !run.path.ends_with(AGENTIC_WORKFLOW_SUFFIX) {
                continue;
            }
            if !request.id_in_bounds(run.id) {
                continue;
            }
            let labels = if request.resolve_labels {
                self.labels_for(&run.pull_requests)?
            } else {
                Vec::new()
            };
            runs.push(RunDescriptor {
                id: run.id,
                workflow_name: run.name.unwrap_or_default(),
                workflow_path: run.path,
                status: run.status.unwrap_or_default(),
                conclusion: run.conclusion.unwrap_or_default(),
                head_branch: run.head_branch.unwrap_or_default(),
                event: run.event,
                created_at: run.created_at,
                updated_at: run.updated_at,
                html_url: run.html_url,
                labels,
            });
        }

        Ok(RunBatch {
            runs,
            total_fetched,
            oldest_created_at,
        })
    }
}

impl ArtifactFetcher for GitHubClient {
    fn download_artifacts(&self, run_id: u64, dest: &Path) -> Result<(), RemoteError> {
        let page: ArtifactsPage = self.get_json(
            &format!("actions/runs/{run_id}/artifacts"),
            &[("per_page", MAX_PER_PAGE.to_string())],
        )?;
        let artifacts: Vec<ArtifactEntry> = page
            .artifacts
            .into_iter()
            .filter(|artifact| !artifact.expired)
            .collect();
        if artifacts.is_empty() {
            return Err(RemoteError::NoArtifacts { run_id });
        }

        let mut archives = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let mut bytes = Vec::new();
            self.call(&artifact.archive_download_url)?
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|e| RemoteError::Request(e.to_string()))?;
            archives.push((artifact.name, bytes));
        }
        install_artifacts(&archives, dest)
    }

    fn failed_jobs(&self, run_id: u64) -> Result<Vec<JobSummary>, RemoteError> {
        let page: JobsPage = self.get_json(
            &format!("actions/runs/{run_id}/jobs"),
            &[("per_page", MAX_PER_PAGE.to_string())],
        )?;
        Ok(page
            .jobs
            .into_iter()
            .filter_map(|job| {
                let conclusion = job.conclusion.unwrap_or_default();
                FAILED_JOB_CONCLUSIONS
                    .contains(&conclusion.as_str())
                    .then_some(JobSummary {
                        id: job.id,
                        name: job.name,
                        conclusion,
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn created_qualifier_combines_range_and_cursor() {
        let before = Utc
            .with_ymd_and_hms(2025, 3, 10, 8, 0, 0)
            .single()
            .expect("timestamp");

        assert_eq!(created_qualifier(None, None, None), None);
        assert_eq!(
            created_qualifier(Some(date(2025, 3, 1)), None, None).as_deref(),
            Some(">=2025-03-01")
        );
        assert_eq!(
            created_qualifier(Some(date(2025, 3, 1)), Some(date(2025, 3, 31)), Some(before))
                .as_deref(),
            Some("2025-03-01..2025-03-10T08:00:00Z")
        );
        assert_eq!(
            created_qualifier(None, Some(date(2025, 3, 5)), Some(before)).as_deref(),
            Some("<=2025-03-05")
        );
    }

    #[test]
    fn named_workflows_resolve_to_lock_files() {
        assert_eq!(
            GitHubClient::runs_path(Some("triage")),
            "actions/workflows/triage.lock.yml/runs"
        );
        assert_eq!(
            GitHubClient::runs_path(Some("ci.yml")),
            "actions/workflows/ci.yml/runs"
        );
        assert_eq!(GitHubClient::runs_path(None), "actions/runs");
    }

    #[test]
    fn workflow_run_payload_deserializes_with_nulls() {
        let page: WorkflowRunsPage = serde_json::from_str(
            r#"{"total_count":1,"workflow_runs":[{"id":7,"name":"Triage","path":".github/workflows/triage.lock.yml","status":"in_progress","conclusion":null,"head_branch":null,"event":"issues","created_at":"2025-03-01T00:00:00Z","updated_at":"2025-03-01T00:05:00Z","html_url":"https://github.com/o/r/actions/runs/7","pull_requests":[{"number":3}]}]}"#,
        )
        .expect("parse page");
        assert_eq!(page.workflow_runs[0].id, 7);
        assert!(page.workflow_runs[0].conclusion.is_none());
        assert_eq!(page.workflow_runs[0].pull_requests[0].number, 3);
    }
}
