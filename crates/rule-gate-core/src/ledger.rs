// crates/rule-gate-core/src/ledger.rs
// ============================================================================
// Module: Original Content Ledger
// Description: Run-scoped record of rule file bytes captured before rewrites.
// Purpose: Guarantee every rewritten file can be restored byte-for-byte.
// Dependencies: crate::audit, crate::files
// ============================================================================

//! ## Overview
//! The [`OriginalContentLedger`] is filled by the rewriter before each write
//! and consumed once by [`OriginalContentLedger::restore`]. Restoration keeps
//! going past individual write failures and reports all of them as one
//! [`RestorationFailure`]. [`LedgerGuard`] owns the ledger for the length of a
//! run and restores it on drop if the run unwinds before finishing.
//!
//! ## Invariants
//! - A path has at most one entry, holding the bytes read before any write.
//! - Entries keep first-recorded order.
//! - Restoration consumes the ledger; nothing is persisted across runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::audit::RunAuditSink;
use crate::audit::RunEventKind;
use crate::files::write_rule_file;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Original bytes of one rewritten file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// File path as rewritten.
    pub path: PathBuf,
    /// Content captured before the rewrite.
    pub original: Vec<u8>,
}

/// Ordered record of original file contents for one run.
#[derive(Debug, Default)]
pub struct OriginalContentLedger {
    /// Entries in first-recorded order.
    entries: Vec<LedgerEntry>,
}

/// Paths restored by a successful restoration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Restored paths in ledger order.
    pub restored: Vec<PathBuf>,
}

/// A single failed restoration write.
#[derive(Debug)]
pub struct RestoreError {
    /// Path that could not be restored.
    pub path: PathBuf,
    /// Underlying write error.
    pub source: io::Error,
}

/// Restoration pass that left at least one file unrestored.
#[derive(Debug)]
pub struct RestorationFailure {
    /// Paths that were restored before or after the failures.
    pub restored: Vec<PathBuf>,
    /// Paths that could not be restored.
    pub failures: Vec<RestoreError>,
}

impl fmt::Display for RestorationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to restore {} rule file(s):", self.failures.len())?;
        for failure in &self.failures {
            write!(f, " {} ({});", failure.path.display(), failure.source)?;
        }
        Ok(())
    }
}

impl std::error::Error for RestorationFailure {}

// ============================================================================
// SECTION: Ledger
// ============================================================================

impl OriginalContentLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the original bytes of `path`.
    ///
    /// Returns `false` and keeps the existing entry when `path` was already
    /// recorded; callers must only write a path after it was newly recorded.
    #[must_use]
    pub fn record(&mut self, path: PathBuf, original: Vec<u8>) -> bool {
        if self.contains(&path) {
            return false;
        }
        self.entries.push(LedgerEntry {
            path,
            original,
        });
        true
    }

    /// Returns true when `path` has an entry.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry.path == path)
    }

    /// Returns the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries in recorded order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Writes every original back to disk, consuming the ledger.
    ///
    /// Each path is attempted even when an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns [`RestorationFailure`] listing every path that could not be
    /// restored.
    pub fn restore(self, sink: &dyn RunAuditSink) -> Result<RestoreSummary, RestorationFailure> {
        let mut restored = Vec::with_capacity(self.entries.len());
        let mut failures = Vec::new();
        for entry in self.entries {
            match write_rule_file(&entry.path, &entry.original) {
                Ok(()) => {
                    sink.emit(RunEventKind::FileRestored {
                        path: entry.path.display().to_string(),
                    });
                    restored.push(entry.path);
                }
                Err(source) => {
                    sink.emit(RunEventKind::RestoreFailed {
                        path: entry.path.display().to_string(),
                        error: source.to_string(),
                    });
                    failures.push(RestoreError {
                        path: entry.path,
                        source,
                    });
                }
            }
        }
        if failures.is_empty() {
            Ok(RestoreSummary {
                restored,
            })
        } else {
            Err(RestorationFailure {
                restored,
                failures,
            })
        }
    }
}

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Owns a run's ledger and restores it on every exit path.
///
/// # Invariants
/// - [`LedgerGuard::finish`] restores exactly once; drop restores only what
///   `finish` did not.
pub struct LedgerGuard<'a> {
    /// Ledger being filled by the run.
    ledger: OriginalContentLedger,
    /// Sink receiving restoration events.
    sink: &'a dyn RunAuditSink,
}

impl<'a> LedgerGuard<'a> {
    /// Creates a guard around an empty ledger.
    #[must_use]
    pub fn new(sink: &'a dyn RunAuditSink) -> Self {
        Self {
            ledger: OriginalContentLedger::new(),
            sink,
        }
    }

    /// Returns the ledger for the rewrite phase.
    pub const fn ledger_mut(&mut self) -> &mut OriginalContentLedger {
        &mut self.ledger
    }

    /// Restores every recorded file and disarms the guard.
    ///
    /// # Errors
    ///
    /// Returns [`RestorationFailure`] when any file could not be restored.
    pub fn finish(mut self) -> Result<RestoreSummary, RestorationFailure> {
        std::mem::take(&mut self.ledger).restore(self.sink)
    }
}

impl Drop for LedgerGuard<'_> {
    fn drop(&mut self) {
        if self.ledger.is_empty() {
            return;
        }
        // Nothing above an unwind can receive the failure.
        if let Err(failure) = std::mem::take(&mut self.ledger).restore(self.sink) {
            self.sink.emit(RunEventKind::RestoreIncomplete {
                restored: failure.restored.len(),
                unrestored: failure
                    .failures
                    .iter()
                    .map(|entry| entry.path.display().to_string())
                    .collect(),
            });
            let _ = writeln!(io::stderr(), "rule-gate: {failure}");
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
