// crates/rule-gate-cli/src/exit_codes.rs
// ============================================================================
// Module: CLI Exit Codes
// Description: Stable process exit codes for every run outcome.
// Purpose: Let CI pipelines tell failing tests apart from broken inputs.
// Dependencies: rule-gate-core
// ============================================================================

//! ## Overview
//! Each [`RunError`] class maps to one exit code. A restoration failure keeps
//! its own code even when it follows an earlier error, since the working tree
//! is no longer in its original state.

use rule_gate_core::RunError;
use rule_gate_core::RunnerFailure;

// ============================================================================
// SECTION: Codes
// ============================================================================

/// Run completed and every rule test passed.
pub const EXIT_OK: u8 = 0;
/// Rule tests ran and failed.
pub const EXIT_TESTS_FAILED: u8 = 1;
/// A rule is missing mandatory metadata.
pub const EXIT_POLICY: u8 = 2;
/// A test or rule document could not be parsed.
pub const EXIT_PARSE: u8 = 3;
/// A file could not be resolved, read or written.
pub const EXIT_IO: u8 = 4;
/// The rule test runner could not be launched.
pub const EXIT_LAUNCH: u8 = 5;
/// Rewritten rule files could not all be restored.
pub const EXIT_RESTORATION: u8 = 6;
/// Configuration or usage error (`EX_USAGE`).
pub const EXIT_USAGE: u8 = 64;

// ============================================================================
// SECTION: Mapping
// ============================================================================

/// Returns the exit code for a failed run.
#[must_use]
pub const fn exit_code_for(err: &RunError) -> u8 {
    match err {
        RunError::Policy {
            ..
        } => EXIT_POLICY,
        RunError::Parse {
            ..
        } => EXIT_PARSE,
        RunError::Io {
            ..
        } => EXIT_IO,
        RunError::Runner(RunnerFailure::Launch(_)) => EXIT_LAUNCH,
        RunError::Runner(RunnerFailure::TestsFailed {
            ..
        }) => EXIT_TESTS_FAILED,
        RunError::Restoration {
            ..
        } => EXIT_RESTORATION,
    }
}
