mod artifact;
mod error;
mod generator;
mod orchestrator;
mod outcome;
mod spec;

pub use artifact::{ArtifactStore, DeployMode, DEFAULT_DAG_NAME};
pub use error::{GenerationError, SpecError};
pub use generator::{AgentGenerator, GenerationPrompts, Generator};
pub use orchestrator::{RetryOrchestrator, DEFAULT_MAX_RETRIES};
pub use outcome::{GenerationOutcome, GenerationReport};
pub use spec::{AttemptFeedback, DestinationSpec, PipelineSpec, SourceSpec, TransformationStep};
