use chrono::Utc;
use dagsmith_judge::{Evaluation, QualityGate};
use dagsmith_logging::{LogEvent, Logger, RunJournal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{AttemptFeedback, GenerationError, GenerationOutcome, Generator, PipelineSpec};

pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Drives the generate, judge, feed back loop for one pipeline spec
pub struct RetryOrchestrator<'a> {
    generator: &'a dyn Generator,
    gate: QualityGate<'a>,
    logger: Arc<Logger>,
    journal: Option<Arc<RunJournal>>,
    max_retries: usize,
    generation_timeout: Option<Duration>,
    interrupted: Arc<AtomicBool>,
}

impl<'a> RetryOrchestrator<'a> {
    pub fn new(generator: &'a dyn Generator, gate: QualityGate<'a>, logger: Arc<Logger>) -> Self {
        Self {
            generator,
            gate,
            logger,
            journal: None,
            max_retries: DEFAULT_MAX_RETRIES,
            generation_timeout: None,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cap on generation calls; values below 1 are raised to 1
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Bound each generator call. A timeout counts as a failed generation.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = Some(timeout);
        self
    }

    pub fn with_journal(mut self, journal: Arc<RunJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Get a handle to signal interruption.
    ///
    /// Checked before each attempt after the first; an attempt already in
    /// flight always runs to completion.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Run attempts until one passes or the budget is spent
    pub async fn run(&self, mut spec: PipelineSpec) -> GenerationOutcome {
        let started = Instant::now();
        let max_retries = self.max_retries;
        let mut last: Option<(String, Evaluation)> = None;

        self.logger.log(&LogEvent::RunStarted {
            pipeline: spec.summary(),
            max_retries,
        });

        for attempt in 1..=max_retries {
            if attempt > 1 && self.interrupted.load(Ordering::SeqCst) {
                info!(completed = attempt - 1, "Run interrupted by user");
                let outcome = GenerationOutcome::interrupted(attempt - 1, last, started.elapsed());
                return self.finish(outcome);
            }

            self.logger.log(&LogEvent::GenerationStarted {
                attempt,
                max_retries,
                feedback_entries: spec.feedback_len(),
            });

            let generation_started = Instant::now();
            let code = match self.generate(&spec).await {
                Ok(code) => code,
                Err(e) => {
                    warn!(attempt, error = %e, "Generation failed");
                    self.logger.log(&LogEvent::GenerationFailed {
                        attempt,
                        error: e.to_string(),
                    });
                    self.record_attempt(attempt, None, None, Some(&e.to_string()));

                    if attempt == max_retries {
                        let outcome = GenerationOutcome::errored(
                            attempt,
                            max_retries,
                            e.to_string(),
                            started.elapsed(),
                        );
                        return self.finish(outcome);
                    }
                    // No evaluation to learn from, so the spec goes forward unchanged
                    continue;
                }
            };

            self.logger.log(&LogEvent::GenerationCompleted {
                attempt,
                code_lines: code.lines().count(),
                duration_secs: generation_started.elapsed().as_secs_f64(),
            });

            self.logger.log(&LogEvent::EvaluationStarted { attempt });
            let evaluation = self.gate.evaluate(&code).await;
            self.logger.log(&LogEvent::EvaluationCompleted {
                attempt,
                score: evaluation.score,
                passed: evaluation.passed,
                issues: evaluation.issues.clone(),
            });
            self.record_attempt(attempt, Some(&code), Some(&evaluation), None);

            if evaluation.passed {
                let outcome = GenerationOutcome::passed(attempt, code, evaluation, started.elapsed());
                return self.finish(outcome);
            }

            if attempt == max_retries {
                let outcome = GenerationOutcome::exhausted(
                    attempt,
                    max_retries,
                    code,
                    evaluation,
                    started.elapsed(),
                );
                return self.finish(outcome);
            }

            spec.add_feedback(AttemptFeedback::from(&evaluation));
            debug!(attempt, feedback_entries = spec.feedback_len(), "Feedback added");
            self.logger.log(&LogEvent::FeedbackAdded {
                attempt,
                feedback_entries: spec.feedback_len(),
            });
            last = Some((code, evaluation));
        }

        // Every iteration of the last attempt returns; max_retries is at least 1
        let outcome = GenerationOutcome::errored(
            max_retries,
            max_retries,
            "Unexpected error in pipeline generation".to_string(),
            started.elapsed(),
        );
        self.finish(outcome)
    }

    async fn generate(&self, spec: &PipelineSpec) -> Result<String, GenerationError> {
        match self.generation_timeout {
            Some(limit) => tokio::time::timeout(limit, self.generator.generate(spec))
                .await
                .map_err(|_| GenerationError::Timeout(limit))?,
            None => self.generator.generate(spec).await,
        }
    }

    fn record_attempt(
        &self,
        attempt: usize,
        code: Option<&str>,
        evaluation: Option<&Evaluation>,
        error: Option<&str>,
    ) {
        let Some(journal) = &self.journal else {
            return;
        };
        let empty: &[String] = &[];
        journal.write_attempt(
            attempt,
            code,
            evaluation.map(|e| e.score),
            evaluation.map(|e| e.passed),
            evaluation.map_or(empty, |e| e.issues.as_slice()),
            evaluation.map_or(empty, |e| e.suggestions.as_slice()),
            error,
            Utc::now(),
        );
    }

    /// Log the terminal event and close the journal
    fn finish(&self, outcome: GenerationOutcome) -> GenerationOutcome {
        let event = match &outcome {
            GenerationOutcome::Passed {
                attempt,
                evaluation,
                total_duration_secs,
                ..
            } => LogEvent::RunPassed {
                attempt: *attempt,
                score: evaluation.score,
                duration_secs: *total_duration_secs,
            },
            GenerationOutcome::Exhausted {
                attempt,
                evaluation,
                ..
            } => LogEvent::RetriesExhausted {
                attempts: *attempt,
                last_score: evaluation.score,
            },
            GenerationOutcome::Errored { attempt, error, .. } => LogEvent::RunErrored {
                attempt: *attempt,
                error: error.clone(),
            },
            GenerationOutcome::Interrupted { attempt, .. } => {
                LogEvent::RunInterrupted { attempts: *attempt }
            }
        };
        self.logger.log(&event);

        if let Some(journal) = &self.journal {
            journal.write_end(
                outcome.status(),
                outcome.attempt(),
                outcome.message(),
                outcome.evaluation().map(|e| e.score),
                outcome.total_duration_secs(),
            );
        }

        outcome
    }
}
