use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::warn;

use dagsmith_agent::{create_agent, AgentConfig, AgentType};
use dagsmith_core::{
    AgentGenerator, ArtifactStore, GenerationOutcome, PipelineSpec, RetryOrchestrator,
    DEFAULT_MAX_RETRIES,
};
use dagsmith_judge::{AgentEvaluator, QualityGate};
use dagsmith_logging::{LogFormat, Logger, RunJournal};
use dagsmith_validator::{DagValidator, ValidationResult};

use crate::check::{print_evaluation, print_validation};
use crate::config::{resolve_agent, ProjectConfig};
use crate::AgentChoice;

/// Directory generated DAGs are saved to when nothing else is configured
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "generated_dags";

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Pipeline spec JSON file
    #[arg(short, long)]
    spec: PathBuf,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Maximum generation attempts (default: 3)
    #[arg(short = 'n', long)]
    max_retries: Option<usize>,

    /// Agent to use for both generator and judge
    #[arg(short, long, value_enum)]
    agent: Option<AgentChoice>,

    /// Agent to use specifically for generation
    #[arg(long, value_enum)]
    generator_agent: Option<AgentChoice>,

    /// Agent to use specifically for judging
    #[arg(long, value_enum)]
    judge_agent: Option<AgentChoice>,

    /// Model to use (if agent supports it)
    #[arg(short, long)]
    model: Option<String>,

    /// Directory to save the generated DAG in
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// File name for the saved DAG (default: the DAG's dag_id)
    #[arg(long)]
    name: Option<String>,

    /// Appended to file names derived from the dag_id
    #[arg(long, default_value = "")]
    suffix: String,

    /// Do not save the generated DAG
    #[arg(long)]
    no_save: bool,

    /// Do not write a run journal
    #[arg(long)]
    no_journal: bool,

    /// Also append every loop event as JSON to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Limit for each generator and judge call
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show what would happen without executing
    #[arg(long)]
    dry_run: bool,
}

/// Resolved settings for one generate run
struct RunSettings {
    working_dir: PathBuf,
    spec_path: PathBuf,
    generator_type: AgentType,
    generator_model: Option<String>,
    judge_type: AgentType,
    judge_model: Option<String>,
    max_retries: usize,
    output_dir: PathBuf,
    timeout: Option<Duration>,
}

impl RunSettings {
    /// Flags win over role config, role config over global config
    fn resolve(args: &GenerateArgs, config: &ProjectConfig, working_dir: PathBuf) -> Result<Self> {
        let cli_agent = |role: Option<AgentChoice>| role.or(args.agent).map(AgentType::from);

        let output_dir = args
            .output_dir
            .clone()
            .or_else(|| config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok(Self {
            spec_path: resolve_path(&working_dir, &args.spec),
            output_dir: resolve_path(&working_dir, &output_dir),
            generator_type: resolve_agent(cli_agent(args.generator_agent), config.generator_agent())?,
            generator_model: args
                .model
                .clone()
                .or_else(|| config.generator_model().map(String::from)),
            judge_type: resolve_agent(cli_agent(args.judge_agent), config.judge_agent())?,
            judge_model: args
                .model
                .clone()
                .or_else(|| config.judge_model().map(String::from)),
            max_retries: args
                .max_retries
                .or(config.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            timeout: args
                .timeout_secs
                .or(config.timeout_secs)
                .map(Duration::from_secs),
            working_dir,
        })
    }

    fn agent_config(&self, model: Option<&String>) -> AgentConfig {
        let mut config = AgentConfig::new(self.working_dir.clone());
        if let Some(model) = model {
            config = config.with_model(model.clone());
        }
        if let Some(limit) = self.timeout {
            config = config.with_timeout(limit);
        }
        config
    }
}

pub async fn handle_generate(args: GenerateArgs, log_format: LogFormat) -> Result<i32> {
    let working_dir = match &args.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();
    let settings = RunSettings::resolve(&args, &config, working_dir)?;

    let spec = PipelineSpec::load(&settings.spec_path)?;

    if args.dry_run {
        print_plan(&settings, &spec);
        return Ok(0);
    }

    let generator_agent = create_agent(settings.generator_type);
    let judge_agent = create_agent(settings.judge_type);

    if !generator_agent.is_available().await {
        anyhow::bail!(
            "Generator agent '{}' is not available. Make sure it's installed and configured.",
            generator_agent.name()
        );
    }
    if !judge_agent.is_available().await {
        anyhow::bail!(
            "Judge agent '{}' is not available. Make sure it's installed and configured.",
            judge_agent.name()
        );
    }

    let generator = AgentGenerator::new(
        generator_agent.as_ref(),
        settings.agent_config(settings.generator_model.as_ref()),
    );
    let evaluator = AgentEvaluator::new(
        judge_agent.as_ref(),
        settings.agent_config(settings.judge_model.as_ref()),
    );

    let mut gate = QualityGate::new(&evaluator);
    if let Some(limit) = settings.timeout {
        gate = gate.with_timeout(limit);
    }

    let logger = match &args.log_file {
        Some(path) => {
            let path = resolve_path(&settings.working_dir, path);
            Logger::with_file(log_format, &path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?
        }
        None => Logger::new(log_format),
    };
    let logger = Arc::new(logger);
    let mut orchestrator =
        RetryOrchestrator::new(&generator, gate, logger).with_max_retries(settings.max_retries);
    if let Some(limit) = settings.timeout {
        orchestrator = orchestrator.with_generation_timeout(limit);
    }

    if !args.no_journal {
        match open_journal(&spec, &settings, orchestrator.max_retries()) {
            Ok(journal) => orchestrator = orchestrator.with_journal(Arc::new(journal)),
            Err(e) => warn!(error = %e, "Run journal disabled"),
        }
    }

    // Handle Ctrl+C gracefully
    let interrupt_handle = orchestrator.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing current attempt...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let outcome = orchestrator.run(spec).await;

    let saved = match outcome.dag_code() {
        Some(code) if outcome.success() && !args.no_save => {
            let store = ArtifactStore::new(&settings.output_dir).with_suffix(args.suffix.as_str());
            Some(
                store
                    .save(code, args.name.as_deref())
                    .context("Failed to save generated DAG")?,
            )
        }
        _ => None,
    };

    // Structural checks run independently of the judge; their findings are
    // reported, not used to retry
    let validator = DagValidator::new();
    let validation = match (&saved, outcome.dag_code()) {
        (Some(path), _) => Some(validator.validate_file(path)),
        (None, Some(code)) => Some(validator.validate_source(code)),
        (None, None) => None,
    };

    if args.json_output {
        let json = serde_json::json!({
            "result": outcome.report(),
            "validation": validation,
            "saved_to": saved,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print_outcome(&outcome, validation.as_ref(), saved.as_deref());
    }

    Ok(outcome.exit_code())
}

fn open_journal(spec: &PipelineSpec, settings: &RunSettings, max_retries: usize) -> Result<RunJournal> {
    let spec_json = spec.to_prompt_json()?;
    let journal = RunJournal::new(&spec_json)?;
    journal.write_start(
        serde_json::to_value(spec)?,
        &settings.generator_type.to_string(),
        &settings.judge_type.to_string(),
        max_retries,
    );
    Ok(journal)
}

fn resolve_path(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

fn print_plan(settings: &RunSettings, spec: &PipelineSpec) {
    let model = |m: &Option<String>| m.clone().unwrap_or_else(|| "default".to_string());

    eprintln!("=== Dry Run ===");
    eprintln!("Spec: {}", settings.spec_path.display());
    eprintln!("Pipeline: {}", spec.summary());
    eprintln!("Transformations: {}", spec.transformations.len());
    eprintln!(
        "Generator: {} (model: {})",
        settings.generator_type,
        model(&settings.generator_model)
    );
    eprintln!(
        "Judge: {} (model: {})",
        settings.judge_type,
        model(&settings.judge_model)
    );
    eprintln!("Max retries: {}", settings.max_retries.max(1));
    eprintln!("Output dir: {}", settings.output_dir.display());
    match settings.timeout {
        Some(limit) => eprintln!("Timeout: {}s per call", limit.as_secs()),
        None => eprintln!("Timeout: none"),
    }
}

fn print_outcome(
    outcome: &GenerationOutcome,
    validation: Option<&ValidationResult>,
    saved: Option<&Path>,
) {
    let banner = match outcome {
        GenerationOutcome::Passed { .. } => "=== PASSED ===".bright_green(),
        GenerationOutcome::Exhausted { .. } => "=== EXHAUSTED ===".bright_yellow(),
        GenerationOutcome::Errored { .. } => "=== FAILED ===".bright_red(),
        GenerationOutcome::Interrupted { .. } => "=== INTERRUPTED ===".bright_yellow(),
    };

    eprintln!();
    eprintln!("{}", banner);
    eprintln!("{}", outcome.message());
    eprintln!("Attempts: {}", outcome.attempt());
    eprintln!("Duration: {:.1}s", outcome.total_duration_secs());

    if let Some(error) = outcome.error() {
        eprintln!("Error: {}", error);
    }
    if let Some(evaluation) = outcome.evaluation() {
        print_evaluation(evaluation);
    }
    if let Some(validation) = validation {
        print_validation(Path::new("generated DAG"), validation);
    }
    if let Some(path) = saved {
        eprintln!("Saved to: {}", path.display());
    }
}
