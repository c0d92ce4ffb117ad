use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use dagsmith_agent::AgentType;
use dagsmith_logging::{init_tracing, LogFormat};

mod check;
mod config;
mod deploy;
mod generate;

use generate::GenerateArgs;

#[derive(Parser, Debug)]
#[command(
    name = "dagsmith",
    about = "Generate, judge and validate Airflow DAGs with language models",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Tracing filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a DAG from a pipeline spec, retrying with judge feedback
    Generate(GenerateArgs),

    /// Run the static structure checks on DAG files
    Validate {
        /// DAG files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json_output: bool,
    },

    /// Score a DAG file with the quality gate
    Judge {
        /// DAG file to score
        file: PathBuf,

        /// Agent to use as the judge
        #[arg(short, long, value_enum)]
        agent: Option<AgentChoice>,

        /// Model to use (if agent supports it)
        #[arg(short, long)]
        model: Option<String>,

        /// Limit for the judge call
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Output the evaluation as JSON
        #[arg(long)]
        json_output: bool,
    },

    /// Copy or move saved DAGs into an Airflow dags folder
    Deploy {
        /// File names inside the source directory
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        files: Vec<String>,

        /// Deploy every .py file in the source directory
        #[arg(long)]
        all: bool,

        /// Move instead of copy
        #[arg(long = "move")]
        move_files: bool,

        /// Airflow dags folder to deploy into
        #[arg(short, long)]
        target: PathBuf,

        /// Directory holding saved DAGs (default: configured output dir)
        #[arg(long)]
        source_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum AgentChoice {
    Claude,
    Opencode,
    Gemini,
}

impl From<AgentChoice> for AgentType {
    fn from(choice: AgentChoice) -> Self {
        match choice {
            AgentChoice::Claude => AgentType::ClaudeCode,
            AgentChoice::Opencode => AgentType::OpenCode,
            AgentChoice::Gemini => AgentType::Gemini,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);

    let exit_code = match cli.command {
        Command::Generate(args) => generate::handle_generate(args, log_format).await?,
        Command::Validate { files, json_output } => check::handle_validate(&files, json_output)?,
        Command::Judge {
            file,
            agent,
            model,
            timeout_secs,
            json_output,
        } => {
            check::handle_judge(check::JudgeArgs {
                file,
                agent: agent.map(Into::into),
                model,
                timeout_secs,
                json_output,
            })
            .await?
        }
        Command::Deploy {
            files,
            all,
            move_files,
            target,
            source_dir,
        } => deploy::handle_deploy(deploy::DeployArgs {
            files,
            all,
            move_files,
            target,
            source_dir,
        })?,
    };

    std::process::exit(exit_code);
}
