use thiserror::Error;

/// Transport-level failures for one tool channel.
///
/// `Protocol` never reaches a caller of `call` - unparseable frames and
/// unmatched ids are logged and skipped by the reader loop - but it is kept
/// in the taxonomy so the reader can classify what it drops.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("could not launch tool server `{command}`: {source}")]
    ProcessLaunch { command: String, #[source] source: std::io::Error },
    #[error("tool call timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("tool channel unavailable: {0}")]
    Unavailable(String),
    #[error("tool protocol violation: {0}")]
    Protocol(String),
    #[error("tool failure [{code}]: {message}")]
    Tool { code: String, message: String },
}

impl ChannelError {
    /// Stable label used in structured log events and health payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProcessLaunch { .. } => "process_launch",
            Self::Timeout { .. } => "timeout",
            Self::Unavailable(_) => "unavailable",
            Self::Protocol(_) => "protocol",
            Self::Tool { .. } => "tool_error",
        }
    }
}

/// Orchestrator-level failures for one agent run.
///
/// Every variant degrades to a formatted reply; nothing here escapes the
/// orchestrator as an unhandled fault. `MissingParameter` is a normal
/// outcome (a clarification request), `UnknownTool` is a programming error
/// logged at error severity.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("missing required parameter `{name}`")]
    MissingParameter { name: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl AgentError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter { .. } => "missing_parameter",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Channel(inner) => inner.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentError, ChannelError};

    #[test]
    fn channel_error_kinds_are_stable() {
        assert_eq!(ChannelError::Timeout { timeout_ms: 50 }.kind(), "timeout");
        assert_eq!(ChannelError::Unavailable("closed".to_string()).kind(), "unavailable");
        assert_eq!(
            ChannelError::Tool { code: "not_found".to_string(), message: "x".to_string() }.kind(),
            "tool_error"
        );
    }

    #[test]
    fn agent_error_inherits_channel_kind() {
        let error = AgentError::from(ChannelError::Timeout { timeout_ms: 50 });
        assert_eq!(error.kind(), "timeout");
        assert_eq!(error.to_string(), "tool call timed out after 50 ms");
    }

    #[test]
    fn missing_parameter_names_the_parameter() {
        let error = AgentError::MissingParameter { name: "quantity".to_string() };
        assert!(error.to_string().contains("quantity"));
    }
}
