use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, warn};

use crate::{Agent, AgentConfig, AgentError, AgentOutput, AgentType};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Google Gemini over the `generateContent` REST endpoint
pub struct GeminiAgent {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
}

impl GeminiAgent {
    /// Create an agent reading the API key from `GEMINI_API_KEY` or `GOOGLE_API_KEY`
    pub fn new() -> Self {
        let api_key = first_api_key(|var| std::env::var(var).ok());

        Self {
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            temperature: 0.1,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
            "generationConfig": {
                "temperature": self.temperature,
            },
        })
    }
}

/// First non-empty key among [`API_KEY_VARS`], in order
fn first_api_key(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .find_map(|var| lookup(var).filter(|key| !key.trim().is_empty()))
}

impl Default for GeminiAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        Some(text)
    }
}

#[async_trait]
impl Agent for GeminiAgent {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn agent_type(&self) -> AgentType {
        AgentType::Gemini
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn execute(&self, prompt: &str, config: &AgentConfig) -> Result<AgentOutput, AgentError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AgentError::ConfigError(format!("set one of {} to use Gemini", API_KEY_VARS.join(" or ")))
        })?;
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let start = Instant::now();

        debug!(
            agent = self.name(),
            model,
            prompt_len = prompt.len(),
            "Executing agent"
        );

        let mut request = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .json(&self.build_request_body(prompt));
        if let Some(limit) = config.timeout {
            request = request.timeout(limit);
        }

        let response = request.send().await.map_err(|e| match config.timeout {
            Some(limit) if e.is_timeout() => AgentError::Timeout(limit),
            _ => AgentError::Http(e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Gemini request rejected");
            return Err(AgentError::ExecutionFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed.into_text().ok_or_else(|| {
            AgentError::ExecutionFailed("Gemini returned no candidates".to_string())
        })?;

        Ok(AgentOutput::new(text, String::new(), 0, start.elapsed()))
    }
}
