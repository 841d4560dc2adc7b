// crates/rule-gate-cli/src/main.rs
// ============================================================================
// Module: Rule Gate CLI Entry Point
// Description: Command dispatcher for rule policy checks and rule test runs.
// Purpose: Provide a localized CLI that gates rule tests on metadata policy.
// Dependencies: clap, rule-gate-config, rule-gate-core, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The Rule Gate CLI validates rule files against the metadata policy, strips
//! their envelopes for the external rule test runner, runs it once and puts
//! every rule file back. All user-facing strings are routed through the i18n
//! catalog.
//!
//! ## Invariants
//! - A run in flight is never abandoned on Ctrl-C or SIGTERM; the CLI waits
//!   for the transaction so rewritten rule files are restored.
//! - The process exit code identifies the error class of a failed run.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rule_gate_cli::exit_codes::EXIT_USAGE;
use rule_gate_cli::exit_codes::exit_code_for;
use rule_gate_cli::i18n::Locale;
use rule_gate_cli::i18n::set_locale;
use rule_gate_cli::t;
use rule_gate_config::RuleGateConfig;
use rule_gate_core::RuleTestRun;
use rule_gate_core::RunError;
use rule_gate_core::RunnerFailure;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "RULE_GATE_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rule-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `RULE_GATE_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate, strip and test rule files, then restore them.
    Test(RunCommand),
    /// Validate rule files against the metadata policy without running tests.
    Check(RunCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments shared by `test` and `check`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Optional config file path (defaults to `rule-gate.toml` or `RULE_GATE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Rule test definition files.
    #[arg(value_name = "TEST_FILE", required = true, num_args = 1..)]
    test_files: Vec<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to `rule-gate.toml` or `RULE_GATE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
    /// Process exit code reported for this error.
    code: u8,
}

impl CliError {
    /// Constructs a usage-class [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self::with_code(message, EXIT_USAGE)
    }

    /// Constructs a [`CliError`] with an explicit exit code.
    const fn with_code(message: String, code: u8) -> Self {
        Self {
            message,
            code,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.message, err.code),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Test(command) => command_test(command).await,
        Commands::Check(command) => command_check(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Run Commands
// ============================================================================

/// Executes the full validate, strip, test and restore transaction.
async fn command_test(command: RunCommand) -> CliResult<ExitCode> {
    let run = build_run(command.config.as_deref())?;
    let test_files = command.test_files;
    let watcher = match InterruptWatcher::new() {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            write_stderr_line(&t!("run.interrupt.unavailable", error = err))
                .map_err(|err| CliError::new(output_error("stderr", &err)))?;
            None
        }
    };
    let result = run_deferring_interrupts(move || run.execute(&test_files), watcher).await?;
    match result {
        Ok(report) => {
            write_stdout_bytes(&report.output)
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            for path in &report.skipped {
                write_stderr_line(&t!("run.skipped", path = path.display()))
                    .map_err(|err| CliError::new(output_error("stderr", &err)))?;
            }
            write_stdout_line(&t!(
                "run.passed",
                tests = report.test_files.len(),
                rewritten = report.restored.len()
            ))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if let Some(output) = err.runner_output() {
                write_stdout_bytes(output)
                    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            }
            Err(CliError::with_code(describe_run_error(&err), exit_code_for(&err)))
        }
    }
}

/// Validates every referenced rule file without writing or testing.
fn command_check(command: &RunCommand) -> CliResult<ExitCode> {
    let run = build_run(command.config.as_deref())?;
    let report = run
        .check(&command.test_files)
        .map_err(|err| CliError::with_code(describe_run_error(&err), exit_code_for(&err)))?;
    write_stdout_line(&t!("check.ok", rules = report.rules, files = report.rule_files.len()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration and assembles a run from it.
fn build_run(path: Option<&Path>) -> CliResult<RuleTestRun> {
    let config = RuleGateConfig::load(path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let runner = config
        .command_runner()
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let sink =
        config.audit_sink().map_err(|err| CliError::new(t!("audit.open_failed", error = err)))?;
    Ok(RuleTestRun::new(config.metadata_policy(), Box::new(runner), config.rewrite_limits(), sink))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = RuleGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Interrupt Deferral
// ============================================================================

/// Ctrl-C and SIGTERM listener used while a run is in flight.
struct InterruptWatcher {
    /// SIGTERM stream.
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl InterruptWatcher {
    /// Registers the signal handlers.
    fn new() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::SignalKind;
            use tokio::signal::unix::signal;
            Ok(Self {
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Waits for the next interrupt.
    async fn recv(&mut self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => result,
                received = self.terminate.recv() => received.ok_or_else(|| {
                    std::io::Error::other("SIGTERM stream closed")
                }),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await
        }
    }
}

/// Runs a blocking job to completion while reporting, but not acting on,
/// interrupts delivered in the meantime.
async fn run_deferring_interrupts<T, F>(
    job: F,
    mut watcher: Option<InterruptWatcher>,
) -> CliResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let mut task = tokio::task::spawn_blocking(job);
    let mut watching = watcher.is_some();
    loop {
        tokio::select! {
            joined = &mut task => {
                return joined.map_err(|err| CliError::new(t!("run.task_failed", error = err)));
            }
            received = next_interrupt(watcher.as_mut()), if watching => {
                let message = match received {
                    Ok(()) => t!("run.interrupt.deferred"),
                    Err(err) => {
                        watching = false;
                        t!("run.interrupt.unavailable", error = err)
                    }
                };
                write_stderr_line(&message)
                    .map_err(|err| CliError::new(output_error("stderr", &err)))?;
            }
        }
    }
}

/// Waits on `watcher`, or forever when there is none.
async fn next_interrupt(watcher: Option<&mut InterruptWatcher>) -> std::io::Result<()> {
    match watcher {
        Some(watcher) => watcher.recv().await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// SECTION: Error Rendering
// ============================================================================

/// Renders a run error as a localized, possibly multi-line message.
fn describe_run_error(err: &RunError) -> String {
    match err {
        RunError::Policy {
            path,
            violation,
        } => t!("run.policy_violation", path = path.display(), detail = violation),
        RunError::Parse {
            path,
            kind,
            message,
        } => t!("run.parse_failed", kind = kind, path = path.display(), error = message),
        RunError::Io {
            path,
            action,
            source,
        } => t!("run.io_failed", action = action, path = path.display(), error = source),
        RunError::Runner(RunnerFailure::Launch(err)) => t!("run.launch_failed", error = err),
        RunError::Runner(RunnerFailure::TestsFailed {
            exit_code,
            ..
        }) => {
            let status = match exit_code {
                Some(code) => t!("run.tests_failed.exit_code", code = code),
                None => t!("run.tests_failed.signal"),
            };
            t!("run.tests_failed", status = status)
        }
        RunError::Restoration {
            failure,
            prior,
        } => {
            let mut lines = vec![t!("run.restore_failed", count = failure.failures.len())];
            for entry in &failure.failures {
                lines.push(t!(
                    "run.restore_failed.path",
                    path = entry.path.display(),
                    error = entry.source
                ));
            }
            if let Some(prior) = prior {
                lines.push(t!("run.restore_failed.prior", error = describe_run_error(prior)));
            }
            lines.join("\n")
        }
    }
}

// ============================================================================
// SECTION: Locale
// ============================================================================

/// Resolves the CLI locale from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!(
                "i18n.lang.invalid_env",
                env = LANG_ENV,
                value = value,
                supported = Locale::supported_labels()
            ))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)?;
    stdout.flush()
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns `code` as the exit code.
fn emit_error(message: &str, code: u8) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(code)
}
