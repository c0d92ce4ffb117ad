use dagsmith_judge::Evaluation;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::SpecError;

/// Structured description of the pipeline to generate.
///
/// Produced upstream (typically by a request parser). Between attempts the
/// orchestrator only ever appends to `feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// The natural-language request the spec was parsed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_request: Option<String>,
    pub source: SourceSpec,
    pub destination: DestinationSpec,
    #[serde(default)]
    pub transformations: Vec<TransformationStep>,
    /// Parser confidence, 0.0 to 1.0
    #[serde(default)]
    pub confidence: f64,
    /// Judge feedback from earlier failed attempts, oldest first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Vec<AttemptFeedback>>,
    /// Any other fields the upstream parser supplied
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub endpoint_or_table: Option<String>,
    #[serde(default)]
    pub query_or_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationStep {
    #[serde(default)]
    pub step_number: u32,
    #[serde(default)]
    pub language: Option<String>,
    pub operation: String,
    #[serde(default)]
    pub target: Option<String>,
}

/// What the judge said about one failed attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFeedback {
    pub previous_issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub score: u8,
}

impl From<&Evaluation> for AttemptFeedback {
    fn from(evaluation: &Evaluation) -> Self {
        Self {
            previous_issues: evaluation.issues.clone(),
            suggestions: evaluation.suggestions.clone(),
            score: evaluation.score,
        }
    }
}

impl PipelineSpec {
    /// Load a spec from a JSON file
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialized form handed to the generator
    pub fn to_prompt_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Append feedback from a failed attempt, creating the list on first use
    pub fn add_feedback(&mut self, feedback: AttemptFeedback) {
        self.feedback.get_or_insert_with(Vec::new).push(feedback);
    }

    pub fn feedback_len(&self) -> usize {
        self.feedback.as_ref().map_or(0, Vec::len)
    }

    /// One-line description for logs, e.g. `API(api/v1/sales) -> Postgres(daily_sales)`
    pub fn summary(&self) -> String {
        let endpoint = |kind: &str, target: Option<&str>| match target {
            Some(target) if !target.is_empty() => format!("{}({})", kind, target),
            _ => kind.to_string(),
        };
        format!(
            "{} -> {}",
            endpoint(&self.source.kind, self.source.endpoint_or_table.as_deref()),
            endpoint(&self.destination.kind, self.destination.path.as_deref()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALES_SPEC: &str = r#"{
        "user_request": "Pull daily sales from the API, clean null customer IDs, load into Postgres",
        "source": {"type": "API", "endpoint_or_table": "google.com/api/v1/sales", "query_or_filter": null},
        "destination": {"type": "Postgres", "path": "daily_sales"},
        "transformations": [
            {"step_number": 1, "language": "Python", "operation": "Null Customer ID Handling", "target": "customer_id"}
        ],
        "confidence": 0.8,
        "priority": "high"
    }"#;

    #[test]
    fn test_parse_spec() {
        let spec = PipelineSpec::from_json(SALES_SPEC).unwrap();
        assert_eq!(spec.source.kind, "API");
        assert_eq!(spec.source.query_or_filter, None);
        assert_eq!(spec.destination.path.as_deref(), Some("daily_sales"));
        assert_eq!(spec.transformations[0].operation, "Null Customer ID Handling");
        assert!(spec.feedback.is_none());
        assert_eq!(spec.extra["priority"], "high");
    }

    #[test]
    fn test_prompt_json_preserves_extra_and_omits_empty_feedback() {
        let spec = PipelineSpec::from_json(SALES_SPEC).unwrap();
        let json: serde_json::Value = serde_json::from_str(&spec.to_prompt_json().unwrap()).unwrap();
        assert_eq!(json["priority"], "high");
        assert_eq!(json["source"]["type"], "API");
        assert!(json.get("feedback").is_none());
    }

    #[test]
    fn test_add_feedback_accumulates() {
        let mut spec = PipelineSpec::from_json(SALES_SPEC).unwrap();
        assert_eq!(spec.feedback_len(), 0);

        let first = AttemptFeedback::from(&Evaluation::new(40, false, vec!["no retries".into()], vec![]));
        spec.add_feedback(first.clone());
        spec.add_feedback(AttemptFeedback::from(&Evaluation::syntax_failure()));

        let feedback = spec.feedback.as_ref().unwrap();
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback[0], first);
        assert_eq!(feedback[1].score, 0);

        let json: serde_json::Value = serde_json::from_str(&spec.to_prompt_json().unwrap()).unwrap();
        assert_eq!(json["feedback"][0]["previous_issues"][0], "no retries");
    }

    #[test]
    fn test_summary() {
        let spec = PipelineSpec::from_json(SALES_SPEC).unwrap();
        assert_eq!(spec.summary(), "API(google.com/api/v1/sales) -> Postgres(daily_sales)");
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let result = PipelineSpec::from_json(r#"{"destination": {"type": "file"}}"#);
        assert!(matches!(result, Err(SpecError::Json(_))));
    }
}
