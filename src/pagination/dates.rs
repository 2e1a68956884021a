use super::PipelineError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

const DAYS_PER_MONTH: i64 = 30;

fn relative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-(\d+)(d|w|mo)$").expect("valid relative date regex"))
}

/// Resolves a date filter to a calendar day.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, and deltas relative to `now`:
/// `-7d`, `-2w`, `-1mo` (a month counts as 30 days).
pub fn resolve_date_bound(raw: &str, now: DateTime<Utc>) -> Result<NaiveDate, PipelineError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc).date_naive());
    }
    if let Some(captures) = relative_re().captures(trimmed) {
        let amount: i64 = captures[1]
            .parse()
            .map_err(|_| PipelineError::InvalidQuery(format!("date `{trimmed}` is out of range")))?;
        let days = match &captures[2] {
            "w" => amount.saturating_mul(7),
            "mo" => amount.saturating_mul(DAYS_PER_MONTH),
            _ => amount,
        };
        let delta = Duration::try_days(days)
            .ok_or_else(|| PipelineError::InvalidQuery(format!("date `{trimmed}` is out of range")))?;
        return now
            .checked_sub_signed(delta)
            .map(|at| at.date_naive())
            .ok_or_else(|| PipelineError::InvalidQuery(format!("date `{trimmed}` is out of range")));
    }
    Err(PipelineError::InvalidQuery(format!(
        "date `{trimmed}` must be YYYY-MM-DD, an RFC 3339 timestamp, or a delta like -1w"
    )))
}
