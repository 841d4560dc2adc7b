// crates/rule-gate-core/src/rewrite.rs
// ============================================================================
// Module: Transactional Rewriter
// Description: Validate, record and strip rule files in place.
// Purpose: Hand the runner bare rule groups while keeping every original.
// Dependencies: crate::{audit, files, ledger, model, policy, strip}
// ============================================================================

//! ## Overview
//! [`RuleFileRewriter::rewrite`] walks the planned rule files in order. Each
//! file is read once, inspected against the [`MetadataPolicy`] and, when it
//! carries the marker field, replaced by its stripped form. The caller owns
//! the [`OriginalContentLedger`], so whatever was rewritten before an error
//! can still be restored.
//!
//! ## Invariants
//! - A path is recorded in the ledger before its first write.
//! - A path is written at most once per run.
//! - Files without the marker field are never written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use crate::audit::RunAuditSink;
use crate::audit::RunEventKind;
use crate::error::DocumentKind;
use crate::error::IoAction;
use crate::error::RunError;
use crate::files::read_bytes_with_limit;
use crate::files::write_rule_file;
use crate::ledger::OriginalContentLedger;
use crate::model::ModelError;
use crate::model::RuleFileEnvelope;
use crate::model::parse_typed;
use crate::policy::MetadataPolicy;
use crate::policy::inspect_document;
use crate::strip::StripOutcome;
use crate::strip::strip_bytes;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default maximum rule file size in bytes.
pub const DEFAULT_MAX_RULE_FILE_BYTES: usize = 4 * 1024 * 1024;
/// Default maximum test-definition file size in bytes.
pub const DEFAULT_MAX_TEST_FILE_BYTES: usize = 1024 * 1024;

/// Input size limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteLimits {
    /// Maximum rule file size in bytes.
    pub max_rule_file_bytes: usize,
    /// Maximum test-definition file size in bytes.
    pub max_test_file_bytes: usize,
}

impl Default for RewriteLimits {
    fn default() -> Self {
        Self {
            max_rule_file_bytes: DEFAULT_MAX_RULE_FILE_BYTES,
            max_test_file_bytes: DEFAULT_MAX_TEST_FILE_BYTES,
        }
    }
}

// ============================================================================
// SECTION: Rewriter
// ============================================================================

/// Files touched by a rewrite pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Paths replaced with their stripped form.
    pub rewritten: Vec<PathBuf>,
    /// Paths left untouched because they carry no marker field.
    pub skipped: Vec<PathBuf>,
}

/// Validates and strips rule files for one run.
pub struct RuleFileRewriter<'a> {
    /// Metadata policy applied to every rule.
    policy: &'a MetadataPolicy,
    /// Input size limits.
    limits: RewriteLimits,
    /// Event sink.
    sink: &'a dyn RunAuditSink,
}

impl<'a> RuleFileRewriter<'a> {
    /// Creates a rewriter.
    #[must_use]
    pub const fn new(
        policy: &'a MetadataPolicy,
        limits: RewriteLimits,
        sink: &'a dyn RunAuditSink,
    ) -> Self {
        Self {
            policy,
            limits,
            sink,
        }
    }

    /// Validates and strips every path, recording originals in `ledger`.
    ///
    /// Stops at the first failing file; files after it are not read.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] for unreadable, malformed, non-compliant or
    /// unwritable files. Entries recorded so far stay in `ledger`.
    pub fn rewrite(
        &self,
        paths: &[PathBuf],
        ledger: &mut OriginalContentLedger,
    ) -> Result<RewriteSummary, RunError> {
        let mut summary = RewriteSummary::default();
        for path in paths {
            if ledger.contains(path) {
                continue;
            }
            let original = self.read(path)?;
            self.validate(path, &original)?;
            let stripped = match strip_bytes(&original) {
                Ok(StripOutcome::Stripped(stripped)) => stripped,
                Ok(StripOutcome::NoMarker) => {
                    self.sink.emit(RunEventKind::RuleFileSkipped {
                        path: path.display().to_string(),
                        reason: "no_marker",
                    });
                    summary.skipped.push(path.clone());
                    continue;
                }
                Err(err) => return Err(parse_error(path, &err)),
            };
            let original_bytes = original.len();
            if !ledger.record(path.clone(), original) {
                continue;
            }
            write_rule_file(path, &stripped).map_err(|source| RunError::Io {
                path: path.clone(),
                action: IoAction::Write,
                source,
            })?;
            self.sink.emit(RunEventKind::RuleFileRewritten {
                path: path.display().to_string(),
                original_bytes,
                stripped_bytes: stripped.len(),
            });
            summary.rewritten.push(path.clone());
        }
        Ok(summary)
    }

    /// Reads and validates one file without writing anything.
    ///
    /// Returns the number of rules inspected.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] for unreadable, malformed or non-compliant files.
    pub fn check_file(&self, path: &Path) -> Result<usize, RunError> {
        let original = self.read(path)?;
        let envelope = self.validate(path, &original)?;
        Ok(envelope.rule_count())
    }

    /// Reads a rule file within the configured limit.
    fn read(&self, path: &Path) -> Result<Vec<u8>, RunError> {
        read_bytes_with_limit(path, self.limits.max_rule_file_bytes).map_err(|source| {
            RunError::Io {
                path: path.to_path_buf(),
                action: IoAction::Read,
                source,
            }
        })
    }

    /// Parses a rule file and applies the policy to every rule.
    fn validate(&self, path: &Path, bytes: &[u8]) -> Result<RuleFileEnvelope, RunError> {
        let envelope = parse_typed(bytes).map_err(|err| parse_error(path, &err))?;
        let display = path.display().to_string();
        for group in envelope.groups() {
            for rule in &group.rules {
                self.sink.emit(RunEventKind::RuleLabels {
                    path: display.clone(),
                    group: group.name.clone(),
                    rule: rule.name().to_string(),
                    labels: rule.labels.keys().cloned().collect(),
                });
            }
        }
        match inspect_document(self.policy, &envelope) {
            Ok(rules) => {
                self.sink.emit(RunEventKind::RuleFileInspected {
                    path: display,
                    rules,
                });
                Ok(envelope)
            }
            Err(violation) => {
                self.sink.emit(RunEventKind::PolicyViolation {
                    path: display,
                    group: violation.group.clone(),
                    rule: violation.rule.clone(),
                    missing_labels: violation.missing.labels.clone(),
                    missing_annotations: violation.missing.annotations.clone(),
                });
                Err(RunError::Policy {
                    path: path.to_path_buf(),
                    violation,
                })
            }
        }
    }
}

/// Maps a model error to a rule file parse error.
fn parse_error(path: &Path, err: &ModelError) -> RunError {
    RunError::Parse {
        path: path.to_path_buf(),
        kind: DocumentKind::RuleFile,
        message: err.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
