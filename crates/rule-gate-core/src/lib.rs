// crates/rule-gate-core/src/lib.rs
// ============================================================================
// Module: Rule Gate Core
// Description: Rule document model, metadata policy and restorable test runs.
// Purpose: Validate rule files, hand them stripped to a tester, restore them.
// Dependencies: serde, serde_json, serde_yaml, tempfile, thiserror
// ============================================================================

//! ## Overview
//! Rule Gate checks alerting and recording rules for mandatory labels and
//! annotations, rewrites each rule file to the rule groups under its `spec`
//! field, runs the external rule tester once over every test definition, and
//! writes the original bytes back afterwards.
//! Invariants:
//! - Every rewritten file is restored before [`RuleTestRun::execute`] returns.
//! - The first policy violation ends the run before the tester is invoked.
//!
//! Rule files are modified in place for the length of a run; callers must not
//! start overlapping runs over the same files.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod duration;
pub mod error;
pub mod files;
pub mod ledger;
pub mod model;
pub mod policy;
pub mod rewrite;
pub mod runner;
pub mod strip;
pub mod test_file;
pub mod transaction;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RunAuditEvent;
pub use audit::RunAuditSink;
pub use audit::RunEventKind;
pub use audit::StderrAuditSink;
pub use duration::RuleDuration;
pub use error::DocumentKind;
pub use error::IoAction;
pub use error::RunError;
pub use error::RunnerFailure;
pub use ledger::LedgerGuard;
pub use ledger::OriginalContentLedger;
pub use ledger::RestorationFailure;
pub use model::RuleDefinition;
pub use model::RuleFileEnvelope;
pub use model::RuleGroup;
pub use model::RuleKind;
pub use policy::MetadataPolicy;
pub use policy::MissingMetadata;
pub use policy::PolicyScope;
pub use policy::PolicyViolation;
pub use rewrite::RewriteLimits;
pub use rewrite::RuleFileRewriter;
pub use runner::CommandTestRunner;
pub use runner::RunnerError;
pub use runner::RunnerOutcome;
pub use runner::TestRunner;
pub use transaction::CheckReport;
pub use transaction::RuleTestRun;
pub use transaction::RunReport;
