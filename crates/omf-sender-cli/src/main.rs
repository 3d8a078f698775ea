// crates/omf-sender-cli/src/main.rs
// ============================================================================
// Module: OMF Sender CLI Entry Point
// Description: Command dispatcher for OMF delivery runs and config checks.
// Purpose: Load configuration, run the orchestrator over HTTP, report results.
// Dependencies: clap, omf-sender-config, omf-sender-core, omf-sender-http, thiserror
// ============================================================================

//! ## Overview
//! `omf-sender run` loads the run file and message files, builds one HTTP
//! channel per destination, and drives the delivery orchestrator with the
//! demo data generator. Structured events stream to stderr as JSON lines;
//! the final run summary is a single JSON object on stdout.
//!
//! `omf-sender config validate` and `omf-sender config show` check and print
//! configuration without contacting any destination.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use omf_sender_cli::SampleDataGenerator;
use omf_sender_cli::report_summary;
use omf_sender_config::OmfSenderConfig;
use omf_sender_core::CancellationFlag;
use omf_sender_core::CycleLimit;
use omf_sender_core::DeliveryOrchestrator;
use omf_sender_core::Destination;
use omf_sender_core::JsonLinesObserver;
use omf_sender_core::MessageCatalog;
use omf_sender_core::NoopObserver;
use omf_sender_core::RunError;
use omf_sender_core::RunObserver;
use omf_sender_core::RunOptions;
use omf_sender_core::RunReport;
use omf_sender_http::HttpDispatcher;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "omf-sender", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create types and containers, stream data, and tear down.
    Run(RunCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the run file and the message files it references.
    Validate(ConfigArgs),
    /// Print the effective configuration with secrets redacted.
    Show(ConfigArgs),
}

/// Shared config location argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Run file path (defaults to `OMF_SENDER_CONFIG`, then `omf-sender.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Run file location.
    #[command(flatten)]
    location: ConfigArgs,
    /// Override the configured number of data cycles.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    cycles: Option<u64>,
    /// Stop a destination on its first data failure and fail the run.
    #[arg(long, action = ArgAction::SetTrue)]
    test_mode: bool,
    /// Leave types and containers in place when the session ends.
    #[arg(long, action = ArgAction::SetTrue)]
    no_cleanup: bool,
    /// Cancel the session after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    stop_after: Option<u64>,
    /// Suppress the JSON-lines event log on stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    quiet: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("omf-sender {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };
    match command {
        Commands::Run(command) => command_run(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let loaded = load_all(&command.location)?;
    let mut options = loaded.config.run_options();
    if let Some(cycles) = command.cycles {
        options.cycles = CycleLimit::Fixed(cycles);
    }
    if command.test_mode {
        options.test_mode = true;
    }
    if command.no_cleanup {
        options.cleanup = false;
    }
    let dispatcher = HttpDispatcher::new(loaded.config.dispatcher_config(), &loaded.destinations)
        .map_err(|err| CliError::new(format!("transport setup failed: {err}")))?;
    let cancellation = CancellationFlag::new();
    if let Some(seconds) = command.stop_after {
        cancel_after(cancellation.clone(), Duration::from_secs(seconds));
    }
    let session = Session {
        dispatcher,
        options,
        cancellation,
        destinations: &loaded.destinations,
        catalog: &loaded.catalog,
    };
    let outcome = if command.quiet {
        session.execute(NoopObserver)
    } else {
        session.execute(JsonLinesObserver::new(std::io::stderr()))
    };
    finish(outcome)
}

/// Inputs for one orchestrated session.
struct Session<'a> {
    /// HTTP transport for every destination.
    dispatcher: HttpDispatcher,
    /// Effective run options after CLI overrides.
    options: RunOptions,
    /// Cancellation shared with the deadline thread.
    cancellation: CancellationFlag,
    /// Resolved destinations in declaration order.
    destinations: &'a [Destination],
    /// Loaded message catalog.
    catalog: &'a MessageCatalog,
}

impl Session<'_> {
    /// Runs the orchestrator with `observer`.
    fn execute<O: RunObserver>(self, observer: O) -> Result<RunReport, RunError> {
        let mut orchestrator = DeliveryOrchestrator::new(
            self.dispatcher,
            SampleDataGenerator::new(),
            observer,
            self.options,
        )
        .with_cancellation(self.cancellation);
        orchestrator.run(self.destinations, self.catalog)
    }
}

/// Converts the run outcome into output and an exit code.
fn finish(outcome: Result<RunReport, RunError>) -> CliResult<ExitCode> {
    match outcome {
        Ok(report) => {
            write_summary(&report)?;
            Ok(if report.success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Err(RunError::DestinationsFailed {
            failed,
            report,
        }) => {
            write_summary(&report)?;
            Err(CliError::new(format!("run failed: {failed} destination(s) failed delivery")))
        }
        Err(err @ RunError::NoDestinationsSelected) => {
            Err(CliError::new(format!("run failed: {err}")))
        }
    }
}

/// Cancels `flag` once `delay` has elapsed.
fn cancel_after(flag: CancellationFlag, delay: Duration) {
    thread::spawn(move || {
        thread::sleep(delay);
        flag.cancel();
    });
}

/// Writes the JSON run summary to stdout.
fn write_summary(report: &RunReport) -> CliResult<()> {
    write_json(&report_summary(report))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(args) => command_config_validate(&args),
        ConfigCommand::Show(args) => command_config_show(&args),
    }
}

/// Executes the config validation command.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    let loaded = load_all(args)?;
    let selected = loaded.destinations.iter().filter(|d| d.is_selected()).count();
    write_stdout_line(&format!(
        "config valid: {} destination(s) ({selected} selected), {} type(s), {} container(s), \
         {} data template(s)",
        loaded.destinations.len(),
        loaded.catalog.types().len(),
        loaded.catalog.containers().len(),
        loaded.catalog.data().len(),
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the config show command.
fn command_config_show(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let destinations = config
        .resolve_destinations()
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    let endpoints: Vec<Value> = destinations
        .iter()
        .map(|destination| {
            json!({
                "name": destination.name().as_str(),
                "kind": destination.kind().as_str(),
                "selected": destination.is_selected(),
                "omf_endpoint": destination.omf_endpoint(),
            })
        })
        .collect();
    let rendered = serde_json::to_value(&config)
        .map_err(|err| CliError::new(format!("config render failed: {err}")))?;
    write_json(&json!({"config": rendered, "endpoints": endpoints}))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Configuration with its resolved destinations and message catalog.
struct Loaded {
    /// Parsed run file.
    config: OmfSenderConfig,
    /// Resolved destinations.
    destinations: Vec<Destination>,
    /// Loaded message files.
    catalog: MessageCatalog,
}

/// Loads the run file only.
fn load_config(args: &ConfigArgs) -> CliResult<OmfSenderConfig> {
    OmfSenderConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Loads the run file, destinations, and message files.
fn load_all(args: &ConfigArgs) -> CliResult<Loaded> {
    let config = load_config(args)?;
    let destinations = config
        .resolve_destinations()
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    let catalog = config
        .load_catalog()
        .map_err(|err| CliError::new(format!("message load failed: {err}")))?;
    Ok(Loaded {
        config,
        destinations,
        catalog,
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(help.trim_end()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes pretty JSON to stdout.
fn write_json(value: &Value) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("output render failed: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write {stream}: {error}")
}

/// Writes an error message to stderr and returns a failure code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
