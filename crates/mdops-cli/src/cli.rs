use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The mdops developers",
    version,
    about = "mdops CLI - Schedule simulation operations on an engine, run it, and collect logged quantities.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Schedule the configured operations, advance the simulation and print log snapshots.
    Run(RunArgs),
    /// List every quantity the configured simulation would log, with its namespace and flag.
    Quantities(QuantitiesArgs),
}

#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Toml,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the run file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the number of steps to run.
    #[arg(short = 'n', long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Override how many steps pass between log snapshots.
    #[arg(short = 'p', long, value_name = "INT")]
    pub log_period: Option<u64>,

    /// Output format for the collected snapshots.
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write snapshots to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Set a specific configuration value, overriding the run file.
    /// Can be used multiple times. Example: -S run.steps=500
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `quantities` subcommand.
#[derive(Args, Debug)]
pub struct QuantitiesArgs {
    /// Path to the run file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Set a specific configuration value, overriding the run file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
