use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use dagsmith_agent::{create_agent, AgentConfig, AgentType};
use dagsmith_judge::{AgentEvaluator, Evaluation, QualityGate};
use dagsmith_validator::{DagValidator, ValidationResult};

use crate::config::{resolve_agent, ProjectConfig};

/// Validate each file; exits 1 when any of them has errors
pub fn handle_validate(files: &[PathBuf], json_output: bool) -> Result<i32> {
    let validator = DagValidator::new();
    let results: Vec<ValidationResult> = files.iter().map(|f| validator.validate_file(f)).collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (file, result) in files.iter().zip(&results) {
            print_validation(file, result);
        }
    }

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        eprintln!();
        eprintln!("{} of {} file(s) failed validation", failed, results.len());
        return Ok(1);
    }
    Ok(0)
}

/// Human-readable reports go to stderr; stdout is reserved for JSON
pub fn print_validation(file: &Path, result: &ValidationResult) {
    eprint!("{}", render_validation(file, result));
}

fn render_validation(file: &Path, result: &ValidationResult) -> String {
    let status = if !result.success {
        "FAIL".bright_red()
    } else if result.has_warnings() {
        "WARN".bright_yellow()
    } else {
        "PASS".bright_green()
    };

    let mut out = format!("{} {}\n", status, file.display());
    for error in &result.errors {
        out.push_str(&format!("  {} {}\n", "error:".red(), error));
    }
    for warning in &result.warnings {
        out.push_str(&format!("  {} {}\n", "warning:".yellow(), warning));
    }
    out
}

pub struct JudgeArgs {
    pub file: PathBuf,
    pub agent: Option<AgentType>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub json_output: bool,
}

/// Score one DAG file; exits 0 when it passes, 1 otherwise
pub async fn handle_judge(args: JudgeArgs) -> Result<i32> {
    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let code = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let judge_type = resolve_agent(args.agent, config.judge_agent())?;
    let judge = create_agent(judge_type);
    if !judge.is_available().await {
        anyhow::bail!(
            "Judge agent '{}' is not available. Make sure it's installed and configured.",
            judge.name()
        );
    }

    let mut agent_config = AgentConfig::new(working_dir);
    if let Some(model) = args.model.or_else(|| config.judge_model().map(String::from)) {
        agent_config = agent_config.with_model(model);
    }
    let timeout = args
        .timeout_secs
        .or(config.timeout_secs)
        .map(Duration::from_secs);
    if let Some(limit) = timeout {
        agent_config = agent_config.with_timeout(limit);
    }

    let evaluator = AgentEvaluator::new(judge.as_ref(), agent_config);
    let mut gate = QualityGate::new(&evaluator);
    if let Some(limit) = timeout {
        gate = gate.with_timeout(limit);
    }

    let evaluation = gate.evaluate(&code).await;

    if args.json_output {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        print_evaluation(&evaluation);
    }

    Ok(if evaluation.passed { 0 } else { 1 })
}

pub fn print_evaluation(evaluation: &Evaluation) {
    let verdict = if evaluation.passed {
        evaluation.short_description().bright_green()
    } else {
        evaluation.short_description().bright_red()
    };
    eprintln!("Judge: {}", verdict);
    for issue in &evaluation.issues {
        eprintln!("  {} {}", "-".dimmed(), issue);
    }
    if !evaluation.suggestions.is_empty() {
        eprintln!("Suggestions:");
        for suggestion in &evaluation.suggestions {
            eprintln!("  {} {}", "-".dimmed(), suggestion);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagsmith_validator::validate;

    const LINKED_DAG: &str = "\
from airflow import DAG
from airflow.operators.bash import BashOperator
dag = DAG(dag_id='x')
a = BashOperator(task_id='a', bash_command='true')
b = BashOperator(task_id='b', bash_command='true')
a >> b
";

    #[test]
    fn test_render_clean_pass() {
        let out = render_validation(Path::new("x.py"), &validate(LINKED_DAG));
        assert!(out.contains("PASS"));
        assert!(out.contains("x.py"));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_render_warnings_are_flagged() {
        let code = LINKED_DAG.replace("a >> b\n", "");
        let out = render_validation(Path::new("x.py"), &validate(&code));
        assert!(out.contains("WARN"));
        assert!(!out.contains("PASS"));
        assert!(out.contains("warning:"));
        assert!(out.contains("no task dependencies"));
    }

    #[test]
    fn test_render_errors() {
        let out = render_validation(Path::new("script.py"), &validate("print('hi')"));
        assert!(out.contains("FAIL"));
        assert_eq!(out.matches("error:").count(), 3);
    }
}
