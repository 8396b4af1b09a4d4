//! loopcheck - growth loop requirement verification
//!
//! CLI entry point. Exit status is 0 only when every validated loop passes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use loopcheck::cli::{Cli, Command, OutputFormat, generate_after_help, get_log_path};
use loopcheck::config::Config;
use loopcheck::events::{EventBus, spawn_event_logger};
use loopcheck::llm::create_client;
use loopcheck::loader::{load_loop_spec, load_loop_specs};
use loopcheck::report::{print_report, report_json};
use loopcheck::validate::{CancelToken, Validator, ValidatorSettings};
use loopcheck::{LoopSpec, LoopValidationResult, inventory};

fn parse_level(s: &str) -> tracing::Level {
    match s.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_stderr: bool) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if to_stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        let log_path = get_log_path();
        if let Some(log_dir) = log_path.parent() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;
        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref(), cli.log_stderr)
        .context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    let all_passed = match cli.command {
        Command::Validate {
            root,
            loops_dir,
            alternatives,
            format,
            events_log,
        } => {
            let loops_dir = loops_dir.unwrap_or_else(|| root.join(&config.validation.loops_dir));
            let specs = load_loop_specs(&loops_dir)?;
            cmd_validate(&config, &root, specs, alternatives, format, events_log).await?
        }
        Command::Functions { root, format } => {
            cmd_functions(&config, &root, format).await?;
            true
        }
        Command::Check {
            spec,
            root,
            alternatives,
            format,
        } => {
            let spec = load_loop_spec(&spec).context(format!("Failed to load {}", spec.display()))?;
            cmd_validate(&config, &root, vec![spec], alternatives, format, None).await?
        }
    };

    if !all_passed {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_validate(
    config: &Config,
    root: &Path,
    specs: Vec<LoopSpec>,
    alternatives: bool,
    format: OutputFormat,
    events_log: Option<PathBuf>,
) -> Result<bool> {
    debug!(?root, loops = specs.len(), alternatives, ?format, "cmd_validate: called");
    config.validate(alternatives)?;

    let bus = Arc::new(EventBus::with_default_capacity());
    let logger = events_log.map(|path| spawn_event_logger(bus.clone(), path));

    let mut validator = Validator::new(root, bus.clone())?.with_settings(ValidatorSettings::from_config(config));
    if alternatives {
        let llm = create_client(&config.llm).context("Failed to create LLM client")?;
        info!(provider = %config.llm.provider, model = %config.llm.model, "Alternative search enabled");
        validator = validator.with_llm(llm);
    }

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling validation");
            on_signal.cancel();
        }
    });

    let results: Vec<LoopValidationResult> = validator.validate_batch(&specs, &cancel).await?;

    // the logger ends once every handle to the bus is gone
    drop(validator);
    drop(bus);
    if let Some(handle) = logger
        && let Err(e) = handle.await
    {
        warn!(error = %e, "Event logger task failed");
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report_json(&results))?),
        OutputFormat::Text => print_report(&results),
    }
    Ok(results.iter().all(LoopValidationResult::all_passed))
}

async fn cmd_functions(config: &Config, root: &Path, format: OutputFormat) -> Result<()> {
    debug!(?root, ?format, "cmd_functions: called");
    let root = root
        .canonicalize()
        .context(format!("Codebase root not accessible: {}", root.display()))?;
    let settings = config.inventory.clone();
    let functions = tokio::task::spawn_blocking(move || inventory::build_inventory(&root, &settings)).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&functions)?),
        OutputFormat::Text => {
            for f in &functions {
                println!("{}:{}  {}", f.file, f.line_number, f.signature);
            }
            println!("\n{} functions", functions.len());
        }
    }
    Ok(())
}
