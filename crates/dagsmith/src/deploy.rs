use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use dagsmith_core::{ArtifactStore, DeployMode};

use crate::config::ProjectConfig;
use crate::generate::DEFAULT_OUTPUT_DIR;

pub struct DeployArgs {
    pub files: Vec<String>,
    pub all: bool,
    pub move_files: bool,
    pub target: PathBuf,
    pub source_dir: Option<PathBuf>,
}

/// Copy or move saved DAGs into an Airflow dags folder; exits 1 when any
/// named file could not be deployed
pub fn handle_deploy(args: DeployArgs) -> Result<i32> {
    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let source_dir = args
        .source_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let store = ArtifactStore::new(working_dir.join(source_dir));
    let target = working_dir.join(&args.target);

    let (deployed, failed) = deploy(&store, &args, &target)?;

    for path in &deployed {
        eprintln!("Deployed {}", path.display());
    }
    for (file, error) in &failed {
        eprintln!("Failed to deploy {}: {}", file, error);
    }
    if deployed.is_empty() && failed.is_empty() {
        eprintln!("Nothing to deploy from {}", store.output_dir().display());
    }

    Ok(if failed.is_empty() { 0 } else { 1 })
}

fn deploy(
    store: &ArtifactStore,
    args: &DeployArgs,
    target: &Path,
) -> Result<(Vec<PathBuf>, Vec<(String, std::io::Error)>)> {
    let mode = if args.move_files {
        DeployMode::Move
    } else {
        DeployMode::Copy
    };

    if args.all {
        let deployed = store
            .deploy_all(target, mode)
            .with_context(|| format!("Failed to read {}", store.output_dir().display()))?;
        return Ok((deployed, Vec::new()));
    }

    let mut deployed = Vec::new();
    let mut failed = Vec::new();
    for file in &args.files {
        match store.deploy(file, target, mode) {
            Ok(path) => deployed.push(path),
            Err(e) => failed.push((file.clone(), e)),
        }
    }
    Ok((deployed, failed))
}
