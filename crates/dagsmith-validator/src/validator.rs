use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::syntax::{parse, parse_lenient};
use crate::Findings;

/// Longest `dag_id` Airflow accepts without complaint
pub const MAX_DAG_ID_LEN: usize = 250;

const MISSING_AIRFLOW_IMPORT: &str = "Missing required import: 'from airflow import DAG'";
const MISSING_DAG_IMPORT: &str = "Missing DAG import from airflow module";
const NO_DAG_CREATION: &str = "No DAG object creation found";
const NO_TASKS: &str = "No Airflow tasks found in DAG";
const SINGLE_TASK: &str = "Only one task found - consider if this is intentional";
const NO_DEPENDENCIES: &str = "Multiple tasks found but no task dependencies (>>) detected";

/// Outcome of validating one DAG source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True exactly when `errors` is empty
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// File the source was read from, when validating by path
    pub file_path: Option<PathBuf>,
}

impl ValidationResult {
    fn new(file_path: Option<PathBuf>) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            file_path,
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.success = false;
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Run every check over `code`, appending to this result
    fn check(&mut self, code: &str) {
        let tree = match parse(code) {
            Ok(tree) => tree,
            Err(e) => {
                // Structural checks need a clean tree
                self.error(e.to_string());
                return;
            }
        };

        let findings = Findings::collect(&tree, code);
        debug!(?findings, "Collected DAG findings");
        self.apply(&findings);
    }

    fn apply(&mut self, findings: &Findings) {
        if !findings.imports_airflow {
            self.error(MISSING_AIRFLOW_IMPORT);
        } else if !findings.imports_dag {
            self.error(MISSING_DAG_IMPORT);
        }

        if !findings.dag_call_found {
            self.error(NO_DAG_CREATION);
        }

        match findings.task_count() {
            0 => self.error(NO_TASKS),
            1 => self.warn(SINGLE_TASK),
            _ if !findings.has_rshift => self.warn(NO_DEPENDENCIES),
            _ => {}
        }

        if let Some(dag_id) = &findings.dag_id {
            if dag_id.chars().count() > MAX_DAG_ID_LEN {
                self.warn(format!(
                    "DAG ID '{}' is longer than {} characters",
                    dag_id, MAX_DAG_ID_LEN
                ));
            }
        }
    }
}

/// Validate DAG source text. Pure: identical input gives identical output.
pub fn validate(code: &str) -> ValidationResult {
    let mut result = ValidationResult::new(None);
    result.check(code);
    result
}

/// Best-effort `dag_id` literal of the first `DAG(...)` call.
///
/// Works on source with syntax errors too, using whatever tree the parser
/// recovers.
pub fn extract_dag_id(code: &str) -> Option<String> {
    let tree = parse_lenient(code).ok()?;
    Findings::collect(&tree, code).dag_id
}

/// Validator for DAG files, optionally resolving bare names against a
/// designated output directory
#[derive(Debug, Clone, Default)]
pub struct DagValidator {
    root: Option<PathBuf>,
}

impl DagValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve names passed to [`DagValidator::validate_named`] inside `root`
    pub fn with_root(root: PathBuf) -> Self {
        Self { root: Some(root) }
    }

    pub fn validate_source(&self, code: &str) -> ValidationResult {
        validate(code)
    }

    /// Validate the file at `path`; a missing file is the only error reported
    pub fn validate_file(&self, path: &Path) -> ValidationResult {
        let mut result = ValidationResult::new(Some(path.to_path_buf()));

        if !path.exists() {
            result.error(format!("File not found: {}", path.display()));
            return result;
        }

        match std::fs::read_to_string(path) {
            Ok(code) => result.check(&code),
            Err(e) => result.error(format!("Unexpected error during validation: {}", e)),
        }
        result
    }

    /// Validate `file_name` inside the configured root (or as given when no root is set)
    pub fn validate_named(&self, file_name: &str) -> ValidationResult {
        let path = match &self.root {
            Some(root) => root.join(file_name),
            None => PathBuf::from(file_name),
        };
        self.validate_file(&path)
    }
}
