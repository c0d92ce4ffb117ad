use dagsmith_validator::extract_dag_id;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File stem used when the code carries no literal `dag_id`
pub const DEFAULT_DAG_NAME: &str = "generated_dag";

/// How [`ArtifactStore::deploy`] places a saved DAG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    Copy,
    Move,
}

/// Writes generated DAG files into an output directory.
///
/// Persistence is never gated on validation; run the validator before or
/// after saving.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    suffix: String,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            suffix: String::new(),
        }
    }

    /// Appended to derived file stems, e.g. `sales_etl_final.py`
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File name `save` would use for this code
    pub fn file_name_for(&self, code: &str, suggested_name: Option<&str>) -> String {
        let name = match suggested_name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name.trim().to_string(),
            None => {
                let stem = extract_dag_id(code)
                    .map(|id| sanitize_stem(&id))
                    .filter(|stem| !stem.is_empty())
                    .unwrap_or_else(|| DEFAULT_DAG_NAME.to_string());
                format!("{}{}", stem, self.suffix)
            }
        };

        if name.ends_with(".py") {
            name
        } else {
            format!("{}.py", name)
        }
    }

    /// Write `code` to the output directory, replacing any existing file
    pub fn save(&self, code: &str, suggested_name: Option<&str>) -> io::Result<PathBuf> {
        let path = self.output_dir.join(self.file_name_for(code, suggested_name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, code)?;

        info!(path = %path.display(), bytes = code.len(), "Saved DAG");
        Ok(path)
    }

    /// Copy or move a saved DAG into `target_dir` (typically an Airflow dags folder)
    pub fn deploy(&self, file_name: &str, target_dir: &Path, mode: DeployMode) -> io::Result<PathBuf> {
        let source = self.output_dir.join(file_name);
        if !source.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Source file not found: {}", source.display()),
            ));
        }

        fs::create_dir_all(target_dir)?;
        let target = target_dir.join(file_name);

        match mode {
            DeployMode::Copy => {
                fs::copy(&source, &target)?;
            }
            DeployMode::Move => {
                // rename fails across filesystems
                if fs::rename(&source, &target).is_err() {
                    fs::copy(&source, &target)?;
                    fs::remove_file(&source)?;
                }
            }
        }

        info!(target = %target.display(), ?mode, "Deployed DAG");
        Ok(target)
    }

    /// Deploy every `.py` file in the output directory, in name order.
    ///
    /// A file that fails to deploy is logged and skipped; a missing output
    /// directory deploys nothing.
    pub fn deploy_all(&self, target_dir: &Path, mode: DeployMode) -> io::Result<Vec<PathBuf>> {
        if !self.output_dir.is_dir() {
            warn!(dir = %self.output_dir.display(), "Output directory not found");
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = fs::read_dir(&self.output_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".py"))
            .collect();
        names.sort();

        let mut deployed = Vec::with_capacity(names.len());
        for name in names {
            match self.deploy(&name, target_dir, mode) {
                Ok(path) => deployed.push(path),
                Err(e) => warn!(file = %name, error = %e, "Failed to deploy DAG"),
            }
        }
        Ok(deployed)
    }
}

/// Keep a dag_id usable as a file stem
fn sanitize_stem(dag_id: &str) -> String {
    dag_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}
