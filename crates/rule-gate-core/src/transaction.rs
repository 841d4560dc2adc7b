// crates/rule-gate-core/src/transaction.rs
// ============================================================================
// Module: Run Transaction
// Description: Validate, rewrite, test and restore as one unit.
// Purpose: Tie the rule gate components into a single restorable run.
// Dependencies: crate::{ledger, rewrite, runner, test_file}
// ============================================================================

//! ## Overview
//! [`RuleTestRun::execute`] plans the run from the test-definition inputs,
//! rewrites every referenced rule file under a [`LedgerGuard`], invokes the
//! runner once, and restores the ledger before returning. Restoration runs
//! whether the rewrite failed, the runner failed, or the tests passed.
//!
//! ## Invariants
//! - Nothing is rewritten until every test definition has been loaded.
//! - The runner is invoked at most once per run.
//! - On return, every rewritten file holds its original bytes or the error is
//!   [`RunError::Restoration`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use crate::audit::RunAuditSink;
use crate::audit::RunEventKind;
use crate::error::RunError;
use crate::error::RunnerFailure;
use crate::ledger::LedgerGuard;
use crate::policy::MetadataPolicy;
use crate::rewrite::RewriteLimits;
use crate::rewrite::RewriteSummary;
use crate::rewrite::RuleFileRewriter;
use crate::runner::RunnerOutcome;
use crate::runner::TestRunner;
use crate::test_file::plan_rule_files;

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Result of a run whose tests passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Test-definition paths passed to the runner.
    pub test_files: Vec<PathBuf>,
    /// Rule files that were stripped for the runner.
    pub rewritten: Vec<PathBuf>,
    /// Rule files left untouched.
    pub skipped: Vec<PathBuf>,
    /// Rule files restored after the runner exited.
    pub restored: Vec<PathBuf>,
    /// Combined runner output.
    pub output: Vec<u8>,
}

/// Result of a validation-only pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Rule files inspected.
    pub rule_files: Vec<PathBuf>,
    /// Total rules inspected.
    pub rules: usize,
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Configured validate, rewrite, test and restore run.
pub struct RuleTestRun {
    /// Metadata policy.
    policy: MetadataPolicy,
    /// External runner.
    runner: Box<dyn TestRunner>,
    /// Input size limits.
    limits: RewriteLimits,
    /// Event sink.
    sink: Arc<dyn RunAuditSink>,
}

impl RuleTestRun {
    /// Creates a run.
    #[must_use]
    pub const fn new(
        policy: MetadataPolicy,
        runner: Box<dyn TestRunner>,
        limits: RewriteLimits,
        sink: Arc<dyn RunAuditSink>,
    ) -> Self {
        Self {
            policy,
            runner,
            limits,
            sink,
        }
    }

    /// Runs the full transaction over `test_files`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RunError`] of the run. A restoration failure wins
    /// over every other error and carries it as `prior`.
    pub fn execute(&self, test_files: &[PathBuf]) -> Result<RunReport, RunError> {
        let sink = self.sink.as_ref();
        let plan = plan_rule_files(test_files, self.limits.max_test_file_bytes, sink)?;
        let mut guard = LedgerGuard::new(sink);
        let rewriter = RuleFileRewriter::new(&self.policy, self.limits, sink);
        let result = rewriter
            .rewrite(&plan.rule_files, guard.ledger_mut())
            .and_then(|summary| self.invoke(&plan.test_files).map(|outcome| (summary, outcome)));
        match (result, guard.finish()) {
            (Ok((summary, outcome)), Ok(restore)) => {
                let RewriteSummary {
                    rewritten,
                    skipped,
                } = summary;
                Ok(RunReport {
                    test_files: plan.test_files,
                    rewritten,
                    skipped,
                    restored: restore.restored,
                    output: outcome.output,
                })
            }
            (Err(err), Ok(_)) => Err(err),
            (result, Err(failure)) => Err(RunError::Restoration {
                failure,
                prior: result.err().map(Box::new),
            }),
        }
    }

    /// Resolves and validates every rule file without writing or testing.
    ///
    /// # Errors
    ///
    /// Returns the first [`RunError`] found.
    pub fn check(&self, test_files: &[PathBuf]) -> Result<CheckReport, RunError> {
        let sink = self.sink.as_ref();
        let plan = plan_rule_files(test_files, self.limits.max_test_file_bytes, sink)?;
        let rewriter = RuleFileRewriter::new(&self.policy, self.limits, sink);
        let mut rules = 0usize;
        for path in &plan.rule_files {
            rules += rewriter.check_file(path)?;
        }
        Ok(CheckReport {
            rule_files: plan.rule_files,
            rules,
        })
    }

    /// Invokes the runner once and turns a failing verdict into an error.
    fn invoke(&self, test_files: &[PathBuf]) -> Result<RunnerOutcome, RunError> {
        self.sink.emit(RunEventKind::RunnerStarted {
            command: self.runner.command(),
            test_files: test_files.len(),
        });
        let outcome = self.runner.run(test_files).map_err(|err| {
            self.sink.emit(RunEventKind::RunnerFailedToStart {
                error: err.to_string(),
            });
            RunError::Runner(RunnerFailure::Launch(err))
        })?;
        self.sink.emit(RunEventKind::RunnerFinished {
            success: outcome.success,
            exit_code: outcome.exit_code,
            output_bytes: outcome.output.len(),
        });
        if outcome.success {
            Ok(outcome)
        } else {
            Err(RunError::Runner(RunnerFailure::TestsFailed {
                exit_code: outcome.exit_code,
                output: outcome.output,
            }))
        }
    }
}
