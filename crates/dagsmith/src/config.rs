//! Project configuration file support for dagsmith.
//!
//! Loads configuration from `dagsmith.toml` in the working directory.

use anyhow::{Context, Result};
use dagsmith_agent::AgentType;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Project-level configuration loaded from `dagsmith.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Global default agent (applies to both generator and judge)
    pub agent: Option<String>,
    /// Global default model (applies to both generator and judge)
    pub model: Option<String>,
    /// Generation attempts per run
    pub max_retries: Option<usize>,
    /// Where generated DAGs are saved
    pub output_dir: Option<PathBuf>,
    /// Per-call limit for the generator and the judge
    pub timeout_secs: Option<u64>,
    /// Generator-specific configuration
    #[serde(default)]
    pub generator: RoleConfig,
    /// Judge-specific configuration
    #[serde(default)]
    pub judge: RoleConfig,
}

/// Configuration for a specific role (generator or judge)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub agent: Option<String>,
    pub model: Option<String>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "dagsmith.toml";

/// Agent used when neither flags nor config name one
pub const DEFAULT_AGENT: AgentType = AgentType::Gemini;

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Priority: [generator].agent > global agent > None
    pub fn generator_agent(&self) -> Option<&str> {
        self.generator.agent.as_deref().or(self.agent.as_deref())
    }

    /// Priority: [generator].model > global model > None
    pub fn generator_model(&self) -> Option<&str> {
        self.generator.model.as_deref().or(self.model.as_deref())
    }

    /// Priority: [judge].agent > global agent > None
    pub fn judge_agent(&self) -> Option<&str> {
        self.judge.agent.as_deref().or(self.agent.as_deref())
    }

    /// Priority: [judge].model > global model > None
    pub fn judge_model(&self) -> Option<&str> {
        self.judge.model.as_deref().or(self.model.as_deref())
    }
}

/// Pick an agent: command-line choice, then config, then [`DEFAULT_AGENT`]
pub fn resolve_agent(cli: Option<AgentType>, configured: Option<&str>) -> Result<AgentType> {
    if let Some(agent_type) = cli {
        return Ok(agent_type);
    }
    match configured {
        Some(name) => name
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{} (in {})", e, CONFIG_FILE_NAME)),
        None => Ok(DEFAULT_AGENT),
    }
}
