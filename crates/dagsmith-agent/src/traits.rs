use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::AgentOutput;

/// Errors that can occur during agent execution
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to spawn agent process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Agent execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("Agent configuration error: {0}")]
    ConfigError(String),

    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Working directory for process-backed agents
    pub working_dir: PathBuf,
    /// Optional timeout (None = no limit)
    pub timeout: Option<Duration>,
    /// Model to use (if agent supports it)
    pub model: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timeout: None,
            model: None,
        }
    }
}

impl AgentConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }
}

/// Supported agent types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentType {
    ClaudeCode,
    OpenCode,
    Gemini,
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentType::ClaudeCode => write!(f, "claude-code"),
            AgentType::OpenCode => write!(f, "opencode"),
            AgentType::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" | "claude-code" | "claudecode" => Ok(AgentType::ClaudeCode),
            "opencode" | "open-code" => Ok(AgentType::OpenCode),
            "gemini" | "google" => Ok(AgentType::Gemini),
            _ => Err(format!("Unknown agent type: {}", s)),
        }
    }
}

/// A language model that turns a prompt into text.
///
/// Both the DAG generator and the quality judge sit on top of this trait, so
/// any backend (a CLI coding agent, a hosted model, a test double) can serve
/// either role.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Human-readable name of the agent (e.g., "Claude Code", "Gemini")
    fn name(&self) -> &str;

    /// The agent type
    fn agent_type(&self) -> AgentType;

    /// Execute a single prompt and capture the response
    async fn execute(&self, prompt: &str, config: &AgentConfig) -> Result<AgentOutput, AgentError>;

    /// Check if the backend is usable (binary on PATH, credentials present)
    async fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_from_str() {
        assert_eq!("claude".parse::<AgentType>().unwrap(), AgentType::ClaudeCode);
        assert_eq!("Open-Code".parse::<AgentType>().unwrap(), AgentType::OpenCode);
        assert_eq!("gemini".parse::<AgentType>().unwrap(), AgentType::Gemini);
        assert!("gpt".parse::<AgentType>().is_err());
    }

    #[test]
    fn test_agent_type_display_round_trips() {
        for agent_type in [AgentType::ClaudeCode, AgentType::OpenCode, AgentType::Gemini] {
            assert_eq!(agent_type.to_string().parse::<AgentType>().unwrap(), agent_type);
        }
    }

    #[test]
    fn test_config_builders() {
        let config = AgentConfig::new(PathBuf::from("/tmp"))
            .with_timeout(Duration::from_secs(30))
            .with_model("gemini-1.5-flash".into());

        assert_eq!(config.working_dir, PathBuf::from("/tmp"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.model.as_deref(), Some("gemini-1.5-flash"));
    }
}
