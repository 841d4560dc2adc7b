// crates/rule-gate-cli/src/lib.rs
// ============================================================================
// Module: Rule Gate CLI Library
// Description: Shared helpers for the Rule Gate command-line interface.
// Purpose: Provide reusable components (i18n, exit codes) for the binary and tests.
// Dependencies: rule-gate-core
// ============================================================================

//! ## Overview
//! This library module houses shared CLI utilities: the internationalized
//! message catalog and the mapping from run outcomes to process exit codes.
//! The binary entry point (`src/main.rs`) imports these helpers to keep all
//! user-facing output consistent.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Process exit codes for each run outcome.
pub mod exit_codes;
/// Internationalization helpers and message catalog.
pub mod i18n;

#[cfg(test)]
mod tests;
