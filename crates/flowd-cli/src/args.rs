use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "flowd", version, about = "Run scripted jobs with typed arguments, sandboxing, and structured events")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bind flags, build a plan, and execute a job's steps
    Run(RunArgs),
    /// Bind flags and print the resolved plan without executing anything
    Plan(PlanArgs),
    /// List jobs discovered under the scripts root
    List(DiscoverArgs),
    /// Print the full discovery result (jobs, aliases, warnings) as JSON
    Discover(DiscoverArgs),
    /// Replay a run's persisted event log
    Events(EventsArgs),
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Ndjson,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Root directory job directories are discovered under
    #[arg(long, default_value = ".")]
    pub scripts_root: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Job id, as a `/`-joined path relative to the scripts root
    pub job_id: String,

    /// Root directory job directories are discovered under
    #[arg(long, default_value = ".")]
    pub scripts_root: PathBuf,

    /// Data directory for run artifacts; defaults to the platform flowd data dir
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Bind a flag as name=value; repeat for multiple flags
    #[arg(long = "flag", value_parser = parse_flag)]
    pub flags: Vec<(String, String)>,

    /// Abort remaining steps on the first failure
    #[arg(long)]
    pub strict: bool,

    /// Event rendering for stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PlanArgs {
    /// Job id, as a `/`-joined path relative to the scripts root
    pub job_id: String,

    #[arg(long, default_value = ".")]
    pub scripts_root: PathBuf,

    #[arg(long = "flag", value_parser = parse_flag)]
    pub flags: Vec<(String, String)>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct EventsArgs {
    /// Run id to replay
    pub run_id: String,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn parse_flag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got {raw:?}")),
    }
}
