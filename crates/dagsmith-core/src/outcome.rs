use dagsmith_judge::Evaluation;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The final outcome of a generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// An attempt passed the quality gate
    Passed {
        attempt: usize,
        dag_code: String,
        evaluation: Evaluation,
        message: String,
        total_duration_secs: f64,
    },
    /// Every attempt was generated and judged, none passed
    Exhausted {
        attempt: usize,
        dag_code: String,
        evaluation: Evaluation,
        message: String,
        total_duration_secs: f64,
    },
    /// The generator failed on the last allowed attempt
    Errored {
        attempt: usize,
        error: String,
        message: String,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C) between attempts
    Interrupted {
        attempt: usize,
        dag_code: Option<String>,
        evaluation: Option<Evaluation>,
        message: String,
        total_duration_secs: f64,
    },
}

/// Flat result record: `success`, `attempt`, `dag_code?`, `evaluation?`, `error?`, `message`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport<'a> {
    pub success: bool,
    pub status: &'static str,
    pub attempt: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dag_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<&'a Evaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    pub message: &'a str,
    pub total_duration_secs: f64,
}

impl GenerationOutcome {
    pub fn passed(attempt: usize, dag_code: String, evaluation: Evaluation, duration: Duration) -> Self {
        Self::Passed {
            attempt,
            dag_code,
            evaluation,
            message: "Pipeline generated and validated successfully".to_string(),
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn exhausted(
        attempt: usize,
        max_retries: usize,
        dag_code: String,
        evaluation: Evaluation,
        duration: Duration,
    ) -> Self {
        Self::Exhausted {
            attempt,
            dag_code,
            evaluation,
            message: format!("Pipeline failed validation after {} attempts", max_retries),
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn errored(attempt: usize, max_retries: usize, error: String, duration: Duration) -> Self {
        Self::Errored {
            attempt,
            error,
            message: format!("Pipeline generation failed after {} attempts", max_retries),
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(
        attempt: usize,
        last: Option<(String, Evaluation)>,
        duration: Duration,
    ) -> Self {
        let (dag_code, evaluation) = match last {
            Some((code, evaluation)) => (Some(code), Some(evaluation)),
            None => (None, None),
        };
        Self::Interrupted {
            attempt,
            dag_code,
            evaluation,
            message: format!("Pipeline generation interrupted after {} attempts", attempt),
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    pub fn attempt(&self) -> usize {
        match self {
            Self::Passed { attempt, .. }
            | Self::Exhausted { attempt, .. }
            | Self::Errored { attempt, .. }
            | Self::Interrupted { attempt, .. } => *attempt,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Passed { message, .. }
            | Self::Exhausted { message, .. }
            | Self::Errored { message, .. }
            | Self::Interrupted { message, .. } => message,
        }
    }

    pub fn dag_code(&self) -> Option<&str> {
        match self {
            Self::Passed { dag_code, .. } | Self::Exhausted { dag_code, .. } => Some(dag_code),
            Self::Interrupted { dag_code, .. } => dag_code.as_deref(),
            Self::Errored { .. } => None,
        }
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            Self::Passed { evaluation, .. } | Self::Exhausted { evaluation, .. } => Some(evaluation),
            Self::Interrupted { evaluation, .. } => evaluation.as_ref(),
            Self::Errored { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Errored { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn total_duration_secs(&self) -> f64 {
        match self {
            Self::Passed {
                total_duration_secs,
                ..
            }
            | Self::Exhausted {
                total_duration_secs,
                ..
            }
            | Self::Errored {
                total_duration_secs,
                ..
            }
            | Self::Interrupted {
                total_duration_secs,
                ..
            } => *total_duration_secs,
        }
    }

    /// Name used in the run journal and JSON output
    pub fn status(&self) -> &'static str {
        match self {
            Self::Passed { .. } => "passed",
            Self::Exhausted { .. } => "exhausted",
            Self::Errored { .. } => "errored",
            Self::Interrupted { .. } => "interrupted",
        }
    }

    pub fn report(&self) -> GenerationReport<'_> {
        GenerationReport {
            success: self.success(),
            status: self.status(),
            attempt: self.attempt(),
            dag_code: self.dag_code(),
            evaluation: self.evaluation(),
            error: self.error(),
            message: self.message(),
            total_duration_secs: self.total_duration_secs(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Passed { .. } => 0,
            Self::Exhausted { .. } => 1,
            Self::Errored { .. } => 2,
            Self::Interrupted { .. } => 130,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_for_passed() {
        let evaluation = Evaluation::new(85, true, vec![], vec![]);
        let outcome = GenerationOutcome::passed(
            2,
            "from airflow import DAG".into(),
            evaluation.clone(),
            Duration::from_secs(3),
        );

        let report = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(report["success"], true);
        assert_eq!(report["attempt"], 2);
        assert_eq!(report["evaluation"]["score"], 85);
        assert_eq!(report["message"], "Pipeline generated and validated successfully");
        assert!(report.get("error").is_none());
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_report_for_errored() {
        let outcome =
            GenerationOutcome::errored(3, 3, "quota exceeded".into(), Duration::from_secs(1));

        let report = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(report["success"], false);
        assert_eq!(report["error"], "quota exceeded");
        assert_eq!(report["message"], "Pipeline generation failed after 3 attempts");
        assert!(report.get("dag_code").is_none());
        assert!(report.get("evaluation").is_none());
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn test_exit_codes() {
        let evaluation = Evaluation::new(40, false, vec![], vec![]);
        let exhausted =
            GenerationOutcome::exhausted(3, 3, String::new(), evaluation, Duration::ZERO);
        let interrupted = GenerationOutcome::interrupted(1, None, Duration::ZERO);

        assert_eq!(exhausted.exit_code(), 1);
        assert_eq!(exhausted.message(), "Pipeline failed validation after 3 attempts");
        assert_eq!(interrupted.exit_code(), 130);
        assert_eq!(interrupted.dag_code(), None);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = GenerationOutcome::errored(1, 1, "boom".into(), Duration::ZERO);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "errored");
        assert_eq!(outcome.status(), "errored");
    }
}
