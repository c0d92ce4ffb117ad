use dagsmith_validator::check_syntax;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{parse_judgment, Evaluation, Evaluator, ScoringError};

/// Syntax pre-check plus an external quality judgment, reduced to one [`Evaluation`].
///
/// `evaluate` never fails: syntax errors, unreachable judges and unreadable
/// answers all map to a failing evaluation so the caller can retry.
pub struct QualityGate<'a> {
    evaluator: &'a dyn Evaluator,
    timeout: Option<Duration>,
}

impl<'a> QualityGate<'a> {
    pub fn new(evaluator: &'a dyn Evaluator) -> Self {
        Self {
            evaluator,
            timeout: None,
        }
    }

    /// Bound each call to the external evaluator
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn evaluate(&self, code: &str) -> Evaluation {
        if let Err(e) = check_syntax(code) {
            debug!(error = %e, "Skipping judge, code does not parse");
            return Evaluation::syntax_failure();
        }

        let response = match self.score(code).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Judge call failed");
                return Evaluation::scoring_failed(&e);
            }
        };

        match parse_judgment(&response) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(error = %e, "Judge response not understood");
                Evaluation::unparseable()
            }
        }
    }

    /// Shorthand for `evaluate(code).passed`
    pub async fn is_acceptable(&self, code: &str) -> bool {
        self.evaluate(code).await.passed
    }

    async fn score(&self, code: &str) -> Result<String, ScoringError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.evaluator.score(code))
                .await
                .map_err(|_| ScoringError::Timeout(limit))?,
            None => self.evaluator.score(code).await,
        }
    }
}
