// crates/rule-gate-core/src/runner.rs
// ============================================================================
// Module: External Test Runner
// Description: Seam for invoking the rule-testing process over test files.
// Purpose: Run the external tester once and capture its combined output.
// Dependencies: tempfile, thiserror
// ============================================================================

//! ## Overview
//! [`TestRunner`] is the seam between the run transaction and the external
//! rule tester. [`CommandTestRunner`] spawns `<program> <args...> <test
//! files...>` and points stdout and stderr at one anonymous temp file, so the
//! captured blob interleaves both streams the way the runner wrote them.
//! Only the exit status decides the verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default runner program.
pub const DEFAULT_RUNNER_PROGRAM: &str = "promtool";
/// Default runner subcommand arguments.
pub const DEFAULT_RUNNER_ARGS: &[&str] = &["test", "rules"];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Verdict and output of one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOutcome {
    /// True when the runner exited successfully.
    pub success: bool,
    /// Exit code when the process exited normally.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: Vec<u8>,
}

/// Errors that prevent a verdict from being obtained.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// No program was configured.
    #[error("runner command is empty")]
    EmptyCommand,
    /// The program could not be spawned.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Spawn error.
        source: io::Error,
    },
    /// The output buffer could not be created or read back.
    #[error("failed to capture runner output: {0}")]
    Capture(io::Error),
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Runs the external rule tester over a set of test-definition files.
pub trait TestRunner: Send + Sync {
    /// Returns the program and fixed arguments, for diagnostics.
    fn command(&self) -> Vec<String>;

    /// Invokes the tester once with every test-definition path.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the tester cannot be launched or its
    /// output cannot be captured. A failing verdict is not an error.
    fn run(&self, test_files: &[PathBuf]) -> Result<RunnerOutcome, RunnerError>;
}

// ============================================================================
// SECTION: Process Runner
// ============================================================================

/// [`TestRunner`] backed by a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTestRunner {
    /// Program to execute.
    program: String,
    /// Arguments placed before the test file paths.
    args: Vec<String>,
}

impl CommandTestRunner {
    /// Builds a runner from `program` followed by its fixed arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::EmptyCommand`] when `command` is empty or its
    /// program is blank.
    pub fn new(command: Vec<String>) -> Result<Self, RunnerError> {
        let mut parts = command.into_iter();
        let program = parts.next().filter(|program| !program.trim().is_empty());
        let Some(program) = program else {
            return Err(RunnerError::EmptyCommand);
        };
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Returns the default `promtool test rules` runner.
    #[must_use]
    pub fn promtool() -> Self {
        Self {
            program: DEFAULT_RUNNER_PROGRAM.to_string(),
            args: DEFAULT_RUNNER_ARGS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl TestRunner for CommandTestRunner {
    fn command(&self) -> Vec<String> {
        std::iter::once(self.program.clone()).chain(self.args.iter().cloned()).collect()
    }

    fn run(&self, test_files: &[PathBuf]) -> Result<RunnerOutcome, RunnerError> {
        let mut capture = tempfile::tempfile().map_err(RunnerError::Capture)?;
        let stdout = capture.try_clone().map_err(RunnerError::Capture)?;
        let stderr = capture.try_clone().map_err(RunnerError::Capture)?;
        let status = Command::new(&self.program)
            .args(&self.args)
            .args(test_files)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .map_err(|source| RunnerError::Launch {
                program: self.program.clone(),
                source,
            })?;
        capture.seek(SeekFrom::Start(0)).map_err(RunnerError::Capture)?;
        let mut output = Vec::new();
        capture.read_to_end(&mut output).map_err(RunnerError::Capture)?;
        Ok(RunnerOutcome {
            success: status.success(),
            exit_code: status.code(),
            output,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
