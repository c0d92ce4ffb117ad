use async_trait::async_trait;
use dagsmith_agent::{Agent, AgentConfig};
use tracing::{debug, info};

use crate::{GenerationError, PipelineSpec};

/// External producer of DAG source from a pipeline spec.
///
/// Malformed code is a valid answer here; the quality gate decides what to do
/// with it. Only a failure to produce anything is an error.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, spec: &PipelineSpec) -> Result<String, GenerationError>;
}

/// Generator that asks an agent to write the DAG
pub struct AgentGenerator<'a> {
    agent: &'a dyn Agent,
    config: AgentConfig,
}

impl<'a> AgentGenerator<'a> {
    pub fn new(agent: &'a dyn Agent, config: AgentConfig) -> Self {
        Self { agent, config }
    }
}

#[async_trait]
impl Generator for AgentGenerator<'_> {
    async fn generate(&self, spec: &PipelineSpec) -> Result<String, GenerationError> {
        let prompt = GenerationPrompts::build_generation_prompt(&spec.to_prompt_json()?);

        debug!(
            agent = self.agent.name(),
            prompt_len = prompt.len(),
            feedback_entries = spec.feedback_len(),
            "Running generator"
        );

        let output = self.agent.execute(&prompt, &self.config).await?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            output_lines = output.stdout_lines(),
            "Generator completed"
        );

        if !output.success() {
            return Err(GenerationError::NonZeroExit(output.exit_code));
        }

        let code = output.unfenced();
        if code.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }

        Ok(code.to_string())
    }
}

/// Prompt templates for the generator
pub struct GenerationPrompts;

impl GenerationPrompts {
    pub fn build_generation_prompt(spec_json: &str) -> String {
        format!(
            r#"You are an expert Apache Airflow engineer. Write a complete Airflow DAG in Python for the pipeline specification below.

## Pipeline Specification
```json
{spec}
```

## Requirements
- Start with `from airflow import DAG` and create exactly one `DAG` with a literal `dag_id`
- One operator per extract, transform and load step, attached to the DAG
- Wire every task together with `>>`
- Set `default_args` with an owner, retries and a retry delay
- Log what each task does and raise on unrecoverable errors

If the specification has a `feedback` list, it holds the judge's verdict on earlier attempts. Fix every listed issue and apply the suggestions.

Return ONLY the Python source, with no explanation before or after it."#,
            spec = spec_json,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagsmith_agent::{AgentError, AgentOutput, AgentType};
    use std::sync::Mutex;
    use std::time::Duration;

    const SPEC: &str = r#"{
        "source": {"type": "S3", "endpoint_or_table": "s3://raw/events"},
        "destination": {"type": "Snowflake", "path": "analytics.events"},
        "confidence": 0.9
    }"#;

    struct ScriptedAgent {
        exit_code: i32,
        response: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedAgent {
        fn new(exit_code: i32, response: &'static str) -> Self {
            Self {
                exit_code,
                response,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            "scripted"
        }

        fn agent_type(&self) -> AgentType {
            AgentType::Gemini
        }

        async fn execute(&self, prompt: &str, _config: &AgentConfig) -> Result<AgentOutput, AgentError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(AgentOutput::new(
                self.response.to_string(),
                String::new(),
                self.exit_code,
                Duration::from_millis(5),
            ))
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_generator_strips_fence() {
        let agent = ScriptedAgent::new(0, "```python\nfrom airflow import DAG\n```");
        let generator = AgentGenerator::new(&agent, AgentConfig::default());
        let spec = PipelineSpec::from_json(SPEC).unwrap();

        let code = generator.generate(&spec).await.unwrap();

        assert_eq!(code, "from airflow import DAG");
        let prompts = agent.prompts.lock().unwrap();
        assert!(prompts[0].contains("s3://raw/events"));
    }

    #[tokio::test]
    async fn test_generator_prompt_carries_feedback() {
        let agent = ScriptedAgent::new(0, "from airflow import DAG");
        let generator = AgentGenerator::new(&agent, AgentConfig::default());
        let mut spec = PipelineSpec::from_json(SPEC).unwrap();
        spec.add_feedback(crate::AttemptFeedback {
            previous_issues: vec!["No retries configured".into()],
            suggestions: vec![],
            score: 45,
        });

        generator.generate(&spec).await.unwrap();

        let prompts = agent.prompts.lock().unwrap();
        assert!(prompts[0].contains("No retries configured"));
    }

    #[tokio::test]
    async fn test_generator_rejects_failed_exit() {
        let agent = ScriptedAgent::new(1, "from airflow import DAG");
        let generator = AgentGenerator::new(&agent, AgentConfig::default());
        let spec = PipelineSpec::from_json(SPEC).unwrap();

        let result = generator.generate(&spec).await;
        assert!(matches!(result, Err(GenerationError::NonZeroExit(1))));
    }

    #[tokio::test]
    async fn test_generator_rejects_empty_output() {
        let agent = ScriptedAgent::new(0, "```python\n```");
        let generator = AgentGenerator::new(&agent, AgentConfig::default());
        let spec = PipelineSpec::from_json(SPEC).unwrap();

        let result = generator.generate(&spec).await;
        assert!(matches!(result, Err(GenerationError::EmptyOutput)));
    }
}
