use dagsmith_agent::strip_code_fence;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Lowest score a DAG can receive and still pass
pub const PASS_THRESHOLD: u8 = 70;

/// Scored verdict on one generated DAG
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Quality score, 0 to 100
    pub score: u8,
    /// Judge approved the DAG and the score met [`PASS_THRESHOLD`]
    pub passed: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Error, Debug)]
pub enum JudgmentParseError {
    #[error("Judgment response was empty")]
    Empty,

    #[error("Failed to parse judgment JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire shape the judge is asked to produce
#[derive(Debug, Deserialize)]
struct RawJudgment {
    score: f64,
    #[serde(default)]
    passed: bool,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

impl Evaluation {
    /// Build an evaluation; `passed` only holds when the score also meets the threshold
    pub fn new(score: u8, passed: bool, issues: Vec<String>, suggestions: Vec<String>) -> Self {
        let score = score.min(100);
        Self {
            score,
            passed: passed && score >= PASS_THRESHOLD,
            issues,
            suggestions,
        }
    }

    /// Code did not parse, so it was never sent to the judge
    pub fn syntax_failure() -> Self {
        Self::new(
            0,
            false,
            vec!["Invalid Python syntax".into()],
            vec!["Fix syntax errors before evaluation".into()],
        )
    }

    /// The judge answered but not in the expected shape
    pub fn unparseable() -> Self {
        Self::new(
            50,
            false,
            vec!["Could not parse evaluation response".into()],
            vec!["Retry evaluation".into()],
        )
    }

    /// The judge could not be reached or failed
    pub fn scoring_failed(error: &dyn std::fmt::Display) -> Self {
        Self::new(
            0,
            false,
            vec![format!("Evaluation error: {}", error)],
            vec!["Check the DAG code for obvious issues".into()],
        )
    }

    /// Get a short description of the verdict for logging
    pub fn short_description(&self) -> String {
        let verdict = if self.passed { "PASS" } else { "FAIL" };
        if self.issues.is_empty() {
            format!("{} ({}/100)", verdict, self.score)
        } else {
            format!("{} ({}/100, {} issues)", verdict, self.score, self.issues.len())
        }
    }
}

/// Parse the judge's raw response.
///
/// Expected format, optionally wrapped in a markdown fence:
/// ```text
/// {"score": 85, "passed": true, "issues": [], "suggestions": ["..."]}
/// ```
pub fn parse_judgment(response: &str) -> Result<Evaluation, JudgmentParseError> {
    let body = strip_code_fence(response);
    if body.is_empty() {
        return Err(JudgmentParseError::Empty);
    }

    debug!(body_len = body.len(), "Parsing judgment");
    let raw: RawJudgment = serde_json::from_str(body)?;
    let score = raw.score.round().clamp(0.0, 100.0) as u8;

    Ok(Evaluation::new(score, raw.passed, raw.issues, raw.suggestions))
}
