use async_trait::async_trait;
use dagsmith_agent::{Agent, AgentConfig, AgentError};
use std::time::Duration;
use tracing::{debug, info};

use crate::JudgePrompts;

/// External scorer of generated DAG code.
///
/// Returns the judge's raw response text; the [`QualityGate`](crate::QualityGate)
/// owns parsing and fallback policy.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn score(&self, code: &str) -> Result<String, ScoringError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("Agent execution error: {0}")]
    AgentError(#[from] AgentError),

    #[error("Judge exited with code {0}")]
    NonZeroExit(i32),

    #[error("Judge timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// Evaluator that asks an agent to score the code
pub struct AgentEvaluator<'a> {
    agent: &'a dyn Agent,
    config: AgentConfig,
}

impl<'a> AgentEvaluator<'a> {
    pub fn new(agent: &'a dyn Agent, config: AgentConfig) -> Self {
        Self { agent, config }
    }
}

#[async_trait]
impl Evaluator for AgentEvaluator<'_> {
    async fn score(&self, code: &str) -> Result<String, ScoringError> {
        let prompt = JudgePrompts::build_scoring_prompt(code);

        debug!(
            agent = self.agent.name(),
            prompt_len = prompt.len(),
            "Running judge"
        );

        let output = self.agent.execute(&prompt, &self.config).await?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            output_lines = output.stdout_lines(),
            "Judge completed"
        );

        if !output.success() {
            return Err(ScoringError::NonZeroExit(output.exit_code));
        }

        Ok(output.stdout)
    }
}
