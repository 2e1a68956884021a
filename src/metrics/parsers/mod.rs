use super::{EngineKind, LogMetrics};

mod claude;
mod codex;
mod copilot;
mod copilot_agent;
mod generic;
pub(crate) mod json_fields;

pub(crate) use claude::claude_entries;

pub use claude::ClaudeParser;
pub use codex::CodexParser;
pub use copilot::CopilotParser;
pub use copilot_agent::CopilotAgentParser;
pub use generic::GenericParser;

/// Converts one log file's text into metrics for a single engine's format.
pub trait LogParser: Send + Sync {
    fn engine(&self) -> EngineKind;

    fn parse(&self, content: &str) -> LogMetrics;
}

static CLAUDE: ClaudeParser = ClaudeParser;
static CODEX: CodexParser = CodexParser;
static COPILOT: CopilotParser = CopilotParser;
static COPILOT_AGENT: CopilotAgentParser = CopilotAgentParser;
static GENERIC: GenericParser = GenericParser;

pub fn parser_for(engine: EngineKind) -> &'static dyn LogParser {
    match engine {
        EngineKind::Claude => &CLAUDE,
        EngineKind::Codex => &CODEX,
        EngineKind::Copilot => &COPILOT,
        EngineKind::CopilotAgent => &COPILOT_AGENT,
        EngineKind::Custom | EngineKind::Generic => &GENERIC,
    }
}
