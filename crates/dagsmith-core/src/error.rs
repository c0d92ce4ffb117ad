use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Agent error: {0}")]
    AgentError(#[from] dagsmith_agent::AgentError),

    #[error("Generator exited with code {0}")]
    NonZeroExit(i32),

    #[error("Generator returned no code")]
    EmptyOutput,

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to serialize pipeline spec: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Failed to read pipeline spec {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline spec: {0}")]
    Json(#[from] serde_json::Error),
}
