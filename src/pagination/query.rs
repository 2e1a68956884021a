use super::dates::resolve_date_bound;
use super::PipelineError;
use crate::filter::RunFilters;
use crate::remote::DateRange;
use chrono::{DateTime, Utc};

/// Caller-facing query for one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogsQuery {
    /// `None` lists every agentic workflow in the repository.
    pub workflow_name: Option<String>,
    pub count: usize,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub git_ref: Option<String>,
    pub before_run_id: Option<u64>,
    pub after_run_id: Option<u64>,
    pub filters: RunFilters,
    pub timeout_secs: Option<u64>,
}

impl LogsQuery {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn lists_all_workflows(&self) -> bool {
        self.workflow_name
            .as_deref()
            .map_or(true, |name| name.trim().is_empty())
    }

    /// Validates the query and resolves its date bounds against `now`.
    pub fn resolve_date_range(&self, now: DateTime<Utc>) -> Result<DateRange, PipelineError> {
        if self.count == 0 {
            return Err(PipelineError::InvalidQuery(
                "count must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(PipelineError::InvalidQuery(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        if let (Some(before), Some(after)) = (self.before_run_id, self.after_run_id) {
            if before <= after {
                return Err(PipelineError::InvalidQuery(format!(
                    "before-run-id {before} must be greater than after-run-id {after}"
                )));
            }
        }

        let bound = |raw: &Option<String>| {
            raw.as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| resolve_date_bound(value, now))
                .transpose()
        };
        let range = DateRange {
            start: bound(&self.start_date)?,
            end: bound(&self.end_date)?,
        };
        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start > end {
                return Err(PipelineError::InvalidQuery(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        Ok(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0)
            .single()
            .expect("timestamp")
    }

    #[test]
    fn malformed_queries_are_rejected() {
        assert!(LogsQuery::new(0).resolve_date_range(now()).is_err());

        let mut query = LogsQuery::new(5);
        query.timeout_secs = Some(0);
        assert!(query.resolve_date_range(now()).is_err());

        let mut query = LogsQuery::new(5);
        query.before_run_id = Some(10);
        query.after_run_id = Some(10);
        assert!(query.resolve_date_range(now()).is_err());

        let mut query = LogsQuery::new(5);
        query.start_date = Some("2025-03-10".to_string());
        query.end_date = Some("-4w".to_string());
        assert!(query.resolve_date_range(now()).is_err());
    }

    #[test]
    fn unbounded_query_resolves_to_empty_range() {
        let range = LogsQuery::new(5).resolve_date_range(now()).expect("range");
        assert!(!range.is_bounded());
    }
}
