//! Auxiliary analyses over a run's structured output and agent log.

pub mod mcp_failures;
pub mod reports;
pub mod safe_outputs;

pub use mcp_failures::{extract_mcp_failures, McpFailureReport};
pub use reports::{
    extract_missing_data, extract_missing_tools, extract_noops, MissingDataReport,
    MissingToolReport, NoopReport,
};
pub use safe_outputs::{
    item_type, load_safe_output_items, normalize_safe_output_type, safe_output_types,
};
