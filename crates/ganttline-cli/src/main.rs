#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ganttline_core::config::{ResolvedConfig, resolve_config};
use ganttline_core::{ErrorCode, GanttlineError};

use cmd::Session;
use output::{CliError, OutputMode, render_error};

#[derive(Parser, Debug)]
#[command(
    name = "ganttline",
    version,
    about = "Project scheduling with snapshot-backed change history"
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Database file (overrides config and GANTTLINE_DB).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Config file (defaults to ./ganttline.toml, then the user config dir).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(next_help_heading = "Entities", about = "Create, list, show, update and delete projects")]
    Project(cmd::project::ProjectArgs),

    #[command(next_help_heading = "Entities", about = "Manage project users")]
    User(cmd::user::UserArgs),

    #[command(next_help_heading = "Entities", about = "Manage main tasks")]
    Task(cmd::task::TaskArgs),

    #[command(next_help_heading = "Entities", about = "Manage subtasks")]
    Subtask(cmd::subtask::SubtaskArgs),

    #[command(
        next_help_heading = "History",
        about = "List snapshots and events, or restore a snapshot",
        after_help = "EXAMPLES:\n    ganttline history list 3\n\n    ganttline history restore 12 --json"
    )]
    History(cmd::history::HistoryArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("GANTTLINE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "ganttline=debug,info"
        } else {
            "ganttline=info,warn"
        })
    });

    let format = env::var("GANTTLINE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);
    let stderr = fmt::layer().with_writer(std::io::stderr);

    match format.as_str() {
        "json" => {
            registry.with(stderr.json().with_ansi(false)).init();
        }
        _ => {
            registry.with(stderr.compact()).init();
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ResolvedConfig> {
    let cwd = env::current_dir()?;
    resolve_config(cli.config.as_deref(), &cwd, cli.db.as_deref())
}

fn run(cli: &Cli, config: &ResolvedConfig, output: OutputMode) -> anyhow::Result<()> {
    let session = Session::open(&config.config)?;
    match &cli.command {
        Commands::Project(args) => cmd::project::run_project(args, &session, output),
        Commands::User(args) => cmd::user::run_user(args, &session, output),
        Commands::Task(args) => cmd::task::run_task(args, &session, output),
        Commands::Subtask(args) => cmd::subtask::run_subtask(args, &session, output),
        Commands::History(args) => cmd::history::run_history(args, &session, output),
    }
}

fn to_cli_error(err: &anyhow::Error) -> CliError {
    err.downcast_ref::<GanttlineError>()
        .map_or_else(|| CliError::new(format!("{err:#}")), CliError::from)
}

fn fail(output: OutputMode, error: &CliError) -> ExitCode {
    if render_error(output, error).is_err() {
        eprintln!("error: {}", error.message);
    }
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = cli.output_mode();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            let error = CliError::with_details(
                format!("{err:#}"),
                code.hint().unwrap_or_else(|| code.message()),
                code.code(),
            );
            return fail(output, &error);
        }
    };
    info!(
        db = %config.config.database.path.display(),
        config = ?config.source,
        "ganttline starting"
    );

    match run(&cli, &config, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(output, &to_cli_error(&err)),
    }
}
