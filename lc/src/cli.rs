//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// loopcheck - growth loop requirement verification
#[derive(Parser)]
#[command(
    name = "lc",
    about = "Verify that growth loop code requirements are implemented in a Python codebase",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Write logs to stderr instead of the log file
    #[arg(long, global = true)]
    pub log_stderr: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate every loop specification in the loops directory
    Validate {
        /// Codebase root
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Loops directory (default: validation.loops-dir under the root)
        #[arg(long)]
        loops_dir: Option<PathBuf>,

        /// Ask the configured LLM for existing alternatives to missing functions
        #[arg(short, long)]
        alternatives: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Append lifecycle events to this JSONL file
        #[arg(long, value_name = "FILE")]
        events_log: Option<PathBuf>,
    },

    /// List every function in the codebase
    Functions {
        /// Codebase root
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a single loop specification file
    Check {
        /// Loop specification JSON file
        #[arg(value_name = "SPEC_FILE")]
        spec: PathBuf,

        /// Codebase root
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Ask the configured LLM for existing alternatives to missing functions
        #[arg(short, long)]
        alternatives: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loopcheck")
        .join("logs")
        .join("loopcheck.log")
}

/// Generate the after_help text
pub fn generate_after_help() -> String {
    format!(
        "Exit status is 0 when every loop passes, 1 otherwise.\n\nLogs are written to: {}\n",
        get_log_path().display()
    )
}

/// Output format for reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use text or json", s)),
        }
    }
}
