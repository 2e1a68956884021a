use crate::artifacts::AGENT_OUTPUTS_DIR;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Claude,
    Codex,
    Copilot,
    /// The hosted coding agent, as opposed to interactive CLI use of Copilot.
    CopilotAgent,
    Custom,
    Generic,
}

/// Where an engine writes its conversation log inside the run artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLocation {
    AgentStdio,
    OutputDir {
        dir: &'static str,
        name_prefixes: &'static [&'static str],
    },
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Copilot => "copilot",
            Self::CopilotAgent => "copilot_agent",
            Self::Custom => "custom",
            Self::Generic => "generic",
        }
    }

    /// Maps an engine identifier from run metadata. Unknown identifiers yield `None`.
    pub fn from_engine_id(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "claude" => Some(Self::Claude),
            "codex" => Some(Self::Codex),
            "copilot" => Some(Self::Copilot),
            "copilot_agent" | "copilot-agent" | "copilot-swe-agent" => Some(Self::CopilotAgent),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn log_location(self) -> LogLocation {
        match self {
            Self::Copilot => LogLocation::OutputDir {
                dir: AGENT_OUTPUTS_DIR,
                name_prefixes: &["session-", "copilot-"],
            },
            Self::CopilotAgent => LogLocation::OutputDir {
                dir: AGENT_OUTPUTS_DIR,
                name_prefixes: &["copilot-agent", "copilot_agent"],
            },
            Self::Claude | Self::Codex | Self::Custom | Self::Generic => LogLocation::AgentStdio,
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
