//! activity-probe - Active window, running application and icon lookup.
//!
//! Prints one JSON document (or a bare data URI for `get_app_icon`) per
//! invocation for the host application to parse.

use activity_probe::config::Config;
use activity_probe::domain::{ErrorResult, QueryResult};
use activity_probe::{Probe, block_on, current_icon_resolver};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Active window and running application introspection.
///
/// Reports the focused application, its window title and icon, and lists
/// running applications, as JSON on stdout.
#[derive(Parser, Debug)]
#[command(name = "activity-probe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Logs go to stderr.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the focused application, window title and icon.
    #[command(name = "get_active_window_info")]
    GetActiveWindowInfo,

    /// Print running applications keyed by name.
    #[command(name = "get_running_applications")]
    GetRunningApplications,

    /// Print the icon of an application as a data URI.
    #[command(name = "get_app_icon")]
    GetAppIcon {
        /// Application name or executable.
        app_name: Option<String>,
    },

    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let message = e.to_string();
            let first_line = message.lines().next().unwrap_or_default();
            let error = first_line.trim_start_matches("error: ");
            return emit_error(&ErrorResult::new(error), false);
        }
    };

    if let Err(e) = init_logging(&args.log_level) {
        return emit_error(&ErrorResult::new(format!("{e:#}")), args.pretty);
    }

    let outcome = block_on(run(&args))
        .context("Failed to start async runtime")
        .and_then(|result| result);
    match outcome {
        Ok(code) => code,
        Err(e) => emit_error(&ErrorResult::new(format!("{e:#}")), args.pretty),
    }
}

/// Initialize logging with the specified level.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(format!("activity_probe={level}"))
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

async fn run(args: &Args) -> Result<ExitCode> {
    let Some(command) = &args.command else {
        return Ok(emit_error(&ErrorResult::new("No command specified"), args.pretty));
    };

    match command {
        Command::GetActiveWindowInfo => {
            let config = load_config(args)?;
            let result: QueryResult<_> = match Probe::for_current_platform(&config) {
                Ok(probe) => QueryResult::Ok(probe.active_window_info().await),
                Err(e) => QueryResult::error(e),
            };
            emit(&result, args.pretty)
        }
        Command::GetRunningApplications => {
            let config = load_config(args)?;
            let result: QueryResult<_> = match Probe::for_current_platform(&config) {
                Ok(probe) => probe.running_applications().await.into(),
                Err(e) => QueryResult::error(e),
            };
            emit(&result, args.pretty)
        }
        Command::GetAppIcon {
            app_name: Some(app_name),
        } => {
            let config = load_config(args)?;
            let icon = current_icon_resolver(&config).resolve(app_name).await;
            println!("{}", icon.to_data_uri());
            Ok(ExitCode::SUCCESS)
        }
        Command::GetAppIcon { app_name: None } => Ok(emit_error(
            &ErrorResult::new("No command or app name specified"),
            args.pretty,
        )),
        Command::Unknown(words) => {
            let name = words.first().map_or("", String::as_str);
            Ok(emit_error(
                &ErrorResult::new(format!("Unknown command: {name}")),
                args.pretty,
            ))
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config =
        Config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    debug!("Configuration loaded: {:?}", config);
    Ok(config)
}

/// Print `result` as JSON. Error results exit with status 1.
fn emit<T: Serialize>(result: &QueryResult<T>, pretty: bool) -> Result<ExitCode> {
    if let QueryResult::Error(error) = result {
        warn!("Query failed: {}", error.error);
    }

    let json = if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    }
    .context("Failed to serialize result")?;
    println!("{json}");

    Ok(if result.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn emit_error(error: &ErrorResult, pretty: bool) -> ExitCode {
    let result: QueryResult<()> = QueryResult::Error(error.clone());
    emit(&result, pretty).unwrap_or(ExitCode::FAILURE)
}
