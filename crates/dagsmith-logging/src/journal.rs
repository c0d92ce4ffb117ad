use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Represents each line type in the run JSONL file.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalLine {
    RunStart {
        timestamp: DateTime<Utc>,
        pipeline_spec: serde_json::Value,
        generator_agent: String,
        judge_agent: String,
        max_retries: usize,
    },
    Attempt {
        attempt: usize,
        dag_code: Option<String>,
        score: Option<u8>,
        passed: Option<bool>,
        issues: Vec<String>,
        suggestions: Vec<String>,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
    RunEnd {
        outcome: String,
        attempts: usize,
        message: String,
        score: Option<u8>,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
}

/// Writes one run's attempts as JSONL to ~/.local/share/dagsmith/runs/.
pub struct RunJournal {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl RunJournal {
    /// Create a journal in the user data directory. The file name combines the
    /// current UTC timestamp with a hash of the serialized pipeline spec.
    pub fn new(spec_json: &str) -> io::Result<Self> {
        Self::in_dir(&Self::runs_dir()?, spec_json)
    }

    /// Create a journal inside `dir`
    pub fn in_dir(dir: &Path, spec_json: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let timestamp_str = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();

        let mut hasher = Sha256::new();
        hasher.update(spec_json.as_bytes());
        let hash = hex::encode(hasher.finalize());
        let short_hash = &hash[..6];

        let path = dir.join(format!("{}_{}.jsonl", timestamp_str, short_hash));
        let file = File::create(&path)?;

        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    /// Returns the path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_start(
        &self,
        pipeline_spec: serde_json::Value,
        generator_agent: &str,
        judge_agent: &str,
        max_retries: usize,
    ) {
        self.write_line(&JournalLine::RunStart {
            timestamp: Utc::now(),
            pipeline_spec,
            generator_agent: generator_agent.to_string(),
            judge_agent: judge_agent.to_string(),
            max_retries,
        });
    }

    /// Write an attempt line. Takes plain fields so this crate stays
    /// independent of the judge and core crates.
    #[allow(clippy::too_many_arguments)]
    pub fn write_attempt(
        &self,
        attempt: usize,
        dag_code: Option<&str>,
        score: Option<u8>,
        passed: Option<bool>,
        issues: &[String],
        suggestions: &[String],
        error: Option<&str>,
        timestamp: DateTime<Utc>,
    ) {
        self.write_line(&JournalLine::Attempt {
            attempt,
            dag_code: dag_code.map(String::from),
            score,
            passed,
            issues: issues.to_vec(),
            suggestions: suggestions.to_vec(),
            error: error.map(String::from),
            timestamp,
        });
    }

    pub fn write_end(
        &self,
        outcome: &str,
        attempts: usize,
        message: &str,
        score: Option<u8>,
        duration_secs: f64,
    ) {
        self.write_line(&JournalLine::RunEnd {
            outcome: outcome.to_string(),
            attempts,
            message: message.to_string(),
            score,
            duration_secs,
            timestamp: Utc::now(),
        });
    }

    fn write_line(&self, line: &JournalLine) {
        if let Ok(json) = serde_json::to_string(line) {
            if let Ok(mut writer) = self.file.lock() {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
    }

    fn runs_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine data directory",
            )
        })?;
        Ok(data_dir.join("dagsmith").join("runs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_journal_lines() {
        let dir = TempDir::new().unwrap();
        let journal = RunJournal::in_dir(dir.path(), "{\"confidence\":0.9}").unwrap();

        journal.write_start(serde_json::json!({"confidence": 0.9}), "gemini", "gemini", 3);
        journal.write_attempt(
            1,
            None,
            None,
            None,
            &[],
            &[],
            Some("quota exceeded"),
            Utc::now(),
        );
        journal.write_attempt(
            2,
            Some("from airflow import DAG"),
            Some(82),
            Some(true),
            &[],
            &["Add retries".to_string()],
            None,
            Utc::now(),
        );
        journal.write_end("passed", 2, "Pipeline generated and validated successfully", Some(82), 4.2);

        let name = journal.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(".jsonl"));

        let content = fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["type"], "run_start");
        assert_eq!(lines[1]["type"], "attempt");
        assert_eq!(lines[1]["error"], "quota exceeded");
        assert!(lines[1]["dag_code"].is_null());
        assert_eq!(lines[2]["score"], 82);
        assert_eq!(lines[3]["type"], "run_end");
        assert_eq!(lines[3]["attempts"], 2);
    }
}
