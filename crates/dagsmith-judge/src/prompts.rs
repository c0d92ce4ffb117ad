use tracing::warn;

use crate::PASS_THRESHOLD;

/// Longest DAG source, in bytes, embedded in a scoring prompt
pub const MAX_JUDGED_CODE_LEN: usize = 20_000;

/// Prompt templates for the judge
pub struct JudgePrompts;

impl JudgePrompts {
    /// Build the scoring prompt for one generated DAG
    pub fn build_scoring_prompt(dag_code: &str) -> String {
        let code = truncate_output(dag_code, MAX_JUDGED_CODE_LEN);
        let note = if code.len() < dag_code.len() {
            warn!(
                original_len = dag_code.len(),
                kept_len = code.len(),
                "DAG code truncated for the judge"
            );
            format!(
                "\nNote: the DAG was truncated to its first {} bytes. Do not penalize the missing tail as incomplete code.\n",
                code.len()
            )
        } else {
            String::new()
        };

        format!(
            r#"You are a code quality judge for Apache Airflow DAGs. Evaluate the DAG below and score it from 0 to 100.

## Criteria (25 points each)
1. **Syntax & Structure**: valid Python, a proper `DAG` object, tasks attached to it
2. **Functionality**: the extract, transform and load steps actually do what the pipeline needs
3. **Best Practices**: Airflow conventions, explicit task dependencies with `>>`, sensible defaults
4. **Error Handling**: retries, logging, and failure handling where data can go missing

## DAG Code
```python
{code}
```
{note}
## Required Response Format
Return ONLY a JSON object, nothing before or after it:
{{
    "score": <number>,
    "passed": <true/false>,
    "issues": ["specific issue found"],
    "suggestions": ["concrete improvement"]
}}

A score of {threshold} or more is passing."#,
            threshold = PASS_THRESHOLD,
        )
    }
}

fn truncate_output(output: &str, max_len: usize) -> &str {
    if output.len() <= max_len {
        return output;
    }

    let mut end = max_len;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    // Try to truncate at a line boundary
    match output[..end].rfind('\n') {
        Some(pos) => &output[..pos],
        None => &output[..end],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_code_and_threshold() {
        let prompt = JudgePrompts::build_scoring_prompt("from airflow import DAG");
        assert!(prompt.contains("```python\nfrom airflow import DAG\n```"));
        assert!(prompt.contains("A score of 70 or more is passing."));
        assert!(prompt.contains("\"score\": <number>"));
    }

    #[test]
    fn test_long_dag_is_truncated_with_note() {
        let line = "x = PythonOperator(task_id='x')\n";
        let code = line.repeat(MAX_JUDGED_CODE_LEN / line.len() + 10);
        let prompt = JudgePrompts::build_scoring_prompt(&code);

        assert!(prompt.contains("Note: the DAG was truncated to its first"));
        assert!(prompt.len() < code.len() + 2000);

        let short = JudgePrompts::build_scoring_prompt(line);
        assert!(!short.contains("truncated"));
    }

    #[test]
    fn test_truncate_at_line_boundary() {
        let text = "line one\nline two\nline three";
        assert_eq!(truncate_output(text, 12), "line one");
        assert_eq!(truncate_output(text, 100), text);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ééééé";
        assert_eq!(truncate_output(text, 3), "é");
    }
}
