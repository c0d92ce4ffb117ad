use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output captured from an agent execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Response text (process stdout or model completion)
    pub stdout: String,
    /// Diagnostic output, empty for HTTP backends
    pub stderr: String,
    /// Exit code from the process (0 for HTTP backends)
    pub exit_code: i32,
    /// Duration of execution
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl AgentOutput {
    pub fn new(stdout: String, stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            duration,
        }
    }

    /// Check if the agent exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Response text with any surrounding markdown code fence removed
    pub fn unfenced(&self) -> &str {
        strip_code_fence(&self.stdout)
    }

    /// Count lines in stdout
    pub fn stdout_lines(&self) -> usize {
        self.stdout.lines().count()
    }
}

/// Remove a markdown code fence wrapping the whole text.
///
/// Handles an optional info string on the opening fence (```` ```json ````,
/// ```` ```python ````). Text that is not fenced is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => ["json", "python", "py"]
            .iter()
            .find_map(|tag| rest.strip_prefix(tag))
            .unwrap_or(rest),
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fence() {
        let text = "```json\n{\"score\": 80}\n```";
        assert_eq!(strip_code_fence(text), "{\"score\": 80}");
    }

    #[test]
    fn test_strip_bare_fence() {
        let text = "  ```\nfrom airflow import DAG\n```  \n";
        assert_eq!(strip_code_fence(text), "from airflow import DAG");
    }

    #[test]
    fn test_strip_single_line_fence() {
        assert_eq!(strip_code_fence("```json{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_unfenced_text_is_trimmed() {
        assert_eq!(strip_code_fence("\n  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_unterminated_fence() {
        assert_eq!(strip_code_fence("```python\nprint('hi')\n"), "print('hi')");
    }

    #[test]
    fn test_output_duration_serializes_as_seconds() {
        let output = AgentOutput::new("ok".into(), String::new(), 0, Duration::from_millis(1500));
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["duration"], 1.5);
        assert!(output.success());
        assert_eq!(output.stdout_lines(), 1);
    }
}
