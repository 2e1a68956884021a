pub const MAX_CONCURRENT_DOWNLOADS_ENV: &str = "RUNSCOPE_MAX_CONCURRENT_DOWNLOADS";
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 10;
pub const MIN_CONCURRENT_DOWNLOADS: usize = 1;
pub const MAX_CONCURRENT_DOWNLOADS: usize = 100;

pub fn is_valid_concurrency(value: usize) -> bool {
    (MIN_CONCURRENT_DOWNLOADS..=MAX_CONCURRENT_DOWNLOADS).contains(&value)
}

/// Parses a raw concurrency override, accepting only values in `[1, 100]`.
pub fn parse_concurrency(raw: &str) -> Option<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|value| is_valid_concurrency(*value))
}

/// Pool size precedence: valid env override, then valid settings value, then the default.
pub fn resolve_max_concurrency(configured: Option<usize>, env_value: Option<&str>) -> usize {
    if let Some(value) = env_value.and_then(parse_concurrency) {
        return value;
    }
    configured
        .filter(|value| is_valid_concurrency(*value))
        .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS)
}

pub fn max_concurrency_from_env(configured: Option<usize>) -> usize {
    let env_value = std::env::var(MAX_CONCURRENT_DOWNLOADS_ENV).ok();
    resolve_max_concurrency(configured, env_value.as_deref())
}
