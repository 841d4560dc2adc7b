// crates/rule-gate-core/src/error.rs
// ============================================================================
// Module: Run Errors
// Description: Error taxonomy for a validate, rewrite, test, restore run.
// Purpose: Give callers exactly one structured outcome per failed run.
// Dependencies: crate::ledger, crate::policy, crate::runner, thiserror
// ============================================================================

//! ## Overview
//! A run ends in success or in exactly one [`RunError`] class. Restoration
//! failures outrank every other class; when one follows an earlier error,
//! the earlier error is kept as context instead of being dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ledger::RestorationFailure;
use crate::policy::PolicyViolation;
use crate::runner::RunnerError;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Kind of document a parse error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Test-definition file.
    TestFile,
    /// Rule file.
    RuleFile,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TestFile => "test file",
            Self::RuleFile => "rule file",
        })
    }
}

/// Filesystem action that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAction {
    /// Resolving a rule file path.
    Resolve,
    /// Reading a file.
    Read,
    /// Writing a stripped rule file.
    Write,
}

impl fmt::Display for IoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolve => "resolve",
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// External runner outcomes that fail a run.
#[derive(Debug, Error)]
pub enum RunnerFailure {
    /// The runner could not be launched or its output could not be captured.
    #[error(transparent)]
    Launch(RunnerError),
    /// The runner exited unsuccessfully.
    #[error("rule tests failed ({})", describe_exit(*.exit_code))]
    TestsFailed {
        /// Exit code when the process exited normally.
        exit_code: Option<i32>,
        /// Combined runner output.
        output: Vec<u8>,
    },
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// A rule is missing mandatory metadata.
    #[error("policy violation in {}: {violation}", .path.display())]
    Policy {
        /// Rule file containing the rule.
        path: PathBuf,
        /// First violation found in the file.
        violation: PolicyViolation,
    },
    /// A test or rule document is malformed.
    #[error("failed to parse {kind} {}: {message}", .path.display())]
    Parse {
        /// Document path.
        path: PathBuf,
        /// Document kind.
        kind: DocumentKind,
        /// Parser message.
        message: String,
    },
    /// A filesystem operation failed.
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Failed action.
        action: IoAction,
        /// Underlying error.
        source: io::Error,
    },
    /// The external runner failed or could not be launched.
    #[error(transparent)]
    Runner(RunnerFailure),
    /// Rewritten files could not all be restored.
    #[error("{failure}{}", describe_prior(.prior.as_deref()))]
    Restoration {
        /// Restoration failures.
        failure: RestorationFailure,
        /// Error that ended the run before restoration, if any.
        prior: Option<Box<RunError>>,
    },
}

impl RunError {
    /// Returns the captured runner output carried by this error, if any.
    #[must_use]
    pub fn runner_output(&self) -> Option<&[u8]> {
        match self {
            Self::Runner(RunnerFailure::TestsFailed {
                output, ..
            }) => Some(output),
            Self::Restoration {
                prior: Some(prior), ..
            } => prior.runner_output(),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Formats an optional exit code.
fn describe_exit(exit_code: Option<i32>) -> String {
    exit_code.map_or_else(|| "terminated by signal".to_string(), |code| format!("exit code {code}"))
}

/// Formats the error that preceded a restoration failure.
fn describe_prior(prior: Option<&RunError>) -> String {
    prior.map_or_else(String::new, |prior| format!(" (after: {prior})"))
}
