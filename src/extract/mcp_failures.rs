use crate::metrics::parsers::claude_entries;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpFailureReport {
    pub server_name: String,
    pub status: String,
}

/// MCP servers reported as failed by the agent's init record.
///
/// Each server is reported once even when the agent restarted and logged
/// several init records.
pub fn extract_mcp_failures(log_content: &str) -> Vec<McpFailureReport> {
    let mut failures: Vec<McpFailureReport> = Vec::new();
    for entry in claude_entries(log_content) {
        if entry.get("type").and_then(Value::as_str) != Some("system")
            || entry.get("subtype").and_then(Value::as_str) != Some("init")
        {
            continue;
        }
        let Some(servers) = entry.get("mcp_servers").and_then(Value::as_array) else {
            continue;
        };
        for server in servers {
            let status = server.get("status").and_then(Value::as_str).unwrap_or_default();
            if status != "failed" {
                continue;
            }
            let Some(name) = server.get("name").and_then(Value::as_str) else {
                continue;
            };
            if failures.iter().any(|known| known.server_name == name) {
                continue;
            }
            failures.push(McpFailureReport {
                server_name: name.to_string(),
                status: status.to_string(),
            });
        }
    }
    failures
}
