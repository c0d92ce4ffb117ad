//! # dagsmith-validator
//!
//! Deterministic structural checks for generated Airflow DAG files.
//!
//! The validator parses Python source with tree-sitter, walks the tree once
//! collecting [`Findings`], and turns those findings into a
//! [`ValidationResult`] of errors and warnings. It never calls out to a model
//! and never fails: unparsable input becomes a single syntax error.
//!
//! ## Checks
//!
//! | check | outcome |
//! |---|---|
//! | source parses | error, remaining checks skipped |
//! | `from airflow import DAG` | error |
//! | a `DAG(...)` call | error |
//! | calls to `*Operator` / `*Sensor` | error when none, warning when exactly one |
//! | `>>` between tasks | warning when several tasks and no `>>` |
//! | `dag_id` length | warning above 250 characters |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dagsmith_validator::DagValidator;
//!
//! let result = DagValidator::new().validate_source("print('hi')");
//! assert!(!result.success);
//! assert_eq!(result.errors.len(), 3);
//! ```

mod findings;
mod syntax;
mod validator;

pub use findings::Findings;
pub use syntax::{check_syntax, SyntaxError};
pub use validator::{extract_dag_id, validate, DagValidator, ValidationResult, MAX_DAG_ID_LEN};
