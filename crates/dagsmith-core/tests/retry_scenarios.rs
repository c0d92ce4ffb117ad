use async_trait::async_trait;
use dagsmith_core::{
    AttemptFeedback, GenerationError, GenerationOutcome, Generator, PipelineSpec, RetryOrchestrator,
};
use dagsmith_judge::{Evaluation, Evaluator, QualityGate, ScoringError};
use dagsmith_logging::Logger;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const SPEC: &str = r#"{
    "user_request": "Pull daily sales from the API and load into Postgres",
    "source": {"type": "API", "endpoint_or_table": "google.com/api/v1/sales", "query_or_filter": null},
    "destination": {"type": "Postgres", "path": "daily_sales"},
    "transformations": [],
    "confidence": 0.8
}"#;

const DAG: &str = r#"from airflow import DAG
from airflow.operators.python import PythonOperator

with DAG(dag_id='daily_sales') as dag:
    extract = PythonOperator(task_id='extract', python_callable=print)
    load = PythonOperator(task_id='load', python_callable=print)
    extract >> load
"#;

/// Generator that follows a script of successes and failures and records the
/// feedback it was shown on every call
struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<&'static str, &'static str>>>,
    seen_feedback: Mutex<Vec<Option<Vec<AttemptFeedback>>>>,
}

impl ScriptedGenerator {
    fn new(script: Vec<Result<&'static str, &'static str>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen_feedback: Mutex::new(Vec::new()),
        }
    }

    fn always(code: &'static str) -> Self {
        Self::new(vec![Ok(code); 16])
    }

    fn calls(&self) -> usize {
        self.seen_feedback.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, spec: &PipelineSpec) -> Result<String, GenerationError> {
        self.seen_feedback.lock().unwrap().push(spec.feedback.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(code)) => Ok(code.to_string()),
            Some(Err(error)) => Err(GenerationError::Other(error.to_string())),
            None => Err(GenerationError::Other("script exhausted".to_string())),
        }
    }
}

/// Evaluator that replays judge responses in order, repeating the last one
struct ScriptedEvaluator {
    responses: Vec<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    fn new(responses: Vec<&'static str>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn score(&self, _code: &str) -> Result<String, ScoringError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let index = call.min(self.responses.len() - 1);
        Ok(self.responses[index].to_string())
    }
}

const FAILING_JUDGMENT: &str = r#"```json
{"score": 40, "passed": false, "issues": ["No retries configured"], "suggestions": ["Set retries in default_args"]}
```"#;

const PASSING_JUDGMENT: &str = r#"{"score": 85, "passed": true, "issues": [], "suggestions": []}"#;

fn spec() -> PipelineSpec {
    PipelineSpec::from_json(SPEC).unwrap()
}

fn orchestrator<'a>(
    generator: &'a ScriptedGenerator,
    evaluator: &'a ScriptedEvaluator,
    max_retries: usize,
) -> RetryOrchestrator<'a> {
    RetryOrchestrator::new(generator, QualityGate::new(evaluator), Arc::new(Logger::quiet()))
        .with_max_retries(max_retries)
}

#[tokio::test]
async fn test_exhausts_after_three_failing_evaluations() {
    let generator = ScriptedGenerator::always(DAG);
    let evaluator = ScriptedEvaluator::new(vec![FAILING_JUDGMENT]);

    let outcome = orchestrator(&generator, &evaluator, 3).run(spec()).await;

    assert!(!outcome.success());
    assert!(matches!(outcome, GenerationOutcome::Exhausted { .. }));
    assert_eq!(outcome.attempt(), 3);
    assert_eq!(outcome.message(), "Pipeline failed validation after 3 attempts");
    assert_eq!(outcome.dag_code(), Some(DAG));
    assert_eq!(
        outcome.evaluation(),
        Some(&Evaluation::new(
            40,
            false,
            vec!["No retries configured".into()],
            vec!["Set retries in default_args".into()],
        ))
    );

    let seen = generator.seen_feedback.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2].as_ref().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_passes_after_two_generator_failures() {
    let generator = ScriptedGenerator::new(vec![Err("rate limited"), Err("rate limited"), Ok(DAG)]);
    let evaluator = ScriptedEvaluator::new(vec![PASSING_JUDGMENT]);

    let outcome = orchestrator(&generator, &evaluator, 3).run(spec()).await;

    assert!(outcome.success());
    assert_eq!(outcome.attempt(), 3);
    assert_eq!(outcome.message(), "Pipeline generated and validated successfully");
    assert_eq!(outcome.evaluation().map(|e| e.score), Some(85));

    // Failed generations carry the spec forward unchanged
    let seen = generator.seen_feedback.lock().unwrap();
    assert!(seen.iter().all(Option::is_none));
}

#[tokio::test]
async fn test_generation_calls_are_bounded() {
    for max_retries in 1..=5 {
        let generator = ScriptedGenerator::always(DAG);
        let evaluator = ScriptedEvaluator::new(vec![FAILING_JUDGMENT]);

        let outcome = orchestrator(&generator, &evaluator, max_retries).run(spec()).await;

        assert_eq!(generator.calls(), max_retries);
        assert_eq!(outcome.attempt(), max_retries);
    }
}

#[tokio::test]
async fn test_stops_on_first_passing_evaluation() {
    let generator = ScriptedGenerator::always(DAG);
    let evaluator = ScriptedEvaluator::new(vec![FAILING_JUDGMENT, PASSING_JUDGMENT, FAILING_JUDGMENT]);

    let outcome = orchestrator(&generator, &evaluator, 5).run(spec()).await;

    assert!(outcome.success());
    assert_eq!(outcome.attempt(), 2);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_feedback_grows_by_one_per_failed_attempt() {
    let generator = ScriptedGenerator::always(DAG);
    let evaluator = ScriptedEvaluator::new(vec![
        r#"{"score": 20, "passed": false, "issues": ["first"], "suggestions": []}"#,
        r#"{"score": 45, "passed": false, "issues": ["second"], "suggestions": []}"#,
        r#"{"score": 60, "passed": false, "issues": ["third"], "suggestions": []}"#,
    ]);

    orchestrator(&generator, &evaluator, 4).run(spec()).await;

    let seen = generator.seen_feedback.lock().unwrap();
    assert_eq!(seen.len(), 4);
    for (k, feedback) in seen.iter().enumerate() {
        assert_eq!(feedback.as_ref().map_or(0, Vec::len), k);
    }

    // Earlier entries are never rewritten
    let last = seen[3].as_ref().unwrap();
    assert_eq!(last[0].previous_issues, vec!["first"]);
    assert_eq!(last[0].score, 20);
    assert_eq!(last[1].previous_issues, vec!["second"]);
    assert_eq!(last[2].score, 60);
    assert_eq!(seen[2].as_ref().unwrap()[..], last[..2]);
}

#[tokio::test]
async fn test_generator_failure_on_last_attempt_is_errored() {
    let generator = ScriptedGenerator::new(vec![Ok(DAG), Err("connection reset")]);
    let evaluator = ScriptedEvaluator::new(vec![FAILING_JUDGMENT]);

    let outcome = orchestrator(&generator, &evaluator, 2).run(spec()).await;

    assert!(!outcome.success());
    assert_eq!(outcome.attempt(), 2);
    assert_eq!(outcome.error(), Some("connection reset"));
    assert_eq!(outcome.message(), "Pipeline generation failed after 2 attempts");
    assert_eq!(outcome.exit_code(), 2);
}

#[tokio::test]
async fn test_syntax_failures_are_retried_with_feedback() {
    let generator = ScriptedGenerator::new(vec![Ok("def broken(:\n"), Ok(DAG)]);
    let evaluator = ScriptedEvaluator::new(vec![PASSING_JUDGMENT]);

    let outcome = orchestrator(&generator, &evaluator, 3).run(spec()).await;

    assert!(outcome.success());
    assert_eq!(outcome.attempt(), 2);
    // The judge is never consulted for code that does not parse
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);

    let seen = generator.seen_feedback.lock().unwrap();
    let feedback = seen[1].as_ref().unwrap();
    assert_eq!(feedback[0].score, 0);
    assert_eq!(feedback[0].previous_issues, vec!["Invalid Python syntax"]);
}
