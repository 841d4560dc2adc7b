// crates/rule-gate-core/tests/transaction.rs
// ============================================================================
// Module: Run Transaction Tests
// Description: End-to-end validate, rewrite, test and restore runs.
// Purpose: Prove rule files are restored byte-for-byte on every exit path.
// ============================================================================

//! ## Overview
//! Drives [`RuleTestRun`] against temp-dir fixtures with a scripted runner
//! that snapshots the rule files while it "runs", so each test can assert
//! both what the tester saw and what was left on disk afterwards.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only panic-based assertions are permitted."
)]

mod common;

use std::fs;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use common::COMPLIANT_RULES;
use common::OWNER_ONLY_RULES;
use common::PLAIN_RULES;
use common::ScriptedRunner;
use common::Verdict;
use common::write_file;
use common::write_test_file;
use rule_gate_core::IoAction;
use rule_gate_core::MemoryAuditSink;
use rule_gate_core::MetadataPolicy;
use rule_gate_core::RewriteLimits;
use rule_gate_core::RuleTestRun;
use rule_gate_core::RunError;
use rule_gate_core::RunEventKind;
use rule_gate_core::RunnerFailure;
use rule_gate_core::TestRunner;

fn run_with(runner: impl TestRunner + 'static, sink: &Arc<MemoryAuditSink>) -> RuleTestRun {
    RuleTestRun::new(
        MetadataPolicy::default(),
        Box::new(runner),
        RewriteLimits::default(),
        Arc::<MemoryAuditSink>::clone(sink),
    )
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap()
}

fn rewritten_paths(sink: &MemoryAuditSink) -> Vec<String> {
    sink.kinds()
        .into_iter()
        .filter_map(|kind| match kind {
            RunEventKind::RuleFileRewritten {
                path, ..
            } => Some(path),
            _ => None,
        })
        .collect()
}

#[test]
fn compliant_run_strips_for_runner_then_restores() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_file(dir.path(), "rules/latency.yaml", COMPLIANT_RULES);
    let test_file = write_test_file(dir.path(), "latency_test.yaml", &["rules/latency.yaml"]);
    let (runner, observed) = ScriptedRunner::new(Verdict::Pass, vec![rules.clone()]);
    let sink = Arc::new(MemoryAuditSink::new());

    let report = run_with(runner, &sink).execute(std::slice::from_ref(&test_file)).unwrap();

    let observed = observed.lock().unwrap();
    assert_eq!(observed.calls, 1);
    let seen = String::from_utf8(observed.contents[0].clone()).unwrap();
    assert!(seen.starts_with("groups:"));
    assert!(!seen.contains("apiVersion"));
    assert!(!seen.contains("metadata"));
    assert!(seen.contains("HighLatency"));
    assert_eq!(fs::read(&rules).unwrap(), COMPLIANT_RULES.as_bytes());
    assert_eq!(report.rewritten, vec![canonical(&rules)]);
    assert_eq!(report.restored, vec![canonical(&rules)]);
    assert_eq!(report.test_files, vec![test_file]);
    assert_eq!(report.output, b"SUCCESS\n");
}

#[test]
fn policy_violation_stops_before_later_files_and_runner() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(dir.path(), "a.yaml", COMPLIANT_RULES);
    let offending = write_file(dir.path(), "b.yaml", OWNER_ONLY_RULES);
    let later = write_file(dir.path(), "c.yaml", COMPLIANT_RULES);
    let test_file = write_test_file(dir.path(), "test.yaml", &["a.yaml", "b.yaml", "c.yaml"]);
    let (runner, observed) = ScriptedRunner::new(Verdict::Pass, Vec::new());
    let sink = Arc::new(MemoryAuditSink::new());

    let err = run_with(runner, &sink).execute(&[test_file]).unwrap_err();

    let RunError::Policy {
        path,
        violation,
    } = err
    else {
        panic!("expected policy violation");
    };
    assert_eq!(path, canonical(&offending));
    assert_eq!(violation.rule, "ErrorBudgetBurn");
    assert_eq!(observed.lock().unwrap().calls, 0);
    assert_eq!(fs::read(&first).unwrap(), COMPLIANT_RULES.as_bytes());
    assert_eq!(fs::read(&offending).unwrap(), OWNER_ONLY_RULES.as_bytes());
    assert_eq!(fs::read(&later).unwrap(), COMPLIANT_RULES.as_bytes());
    assert_eq!(rewritten_paths(&sink), vec![canonical(&first).display().to_string()]);
}

#[test]
fn owner_only_rule_reports_every_missing_name() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "errors.yaml", OWNER_ONLY_RULES);
    let test_file = write_test_file(dir.path(), "test.yaml", &["errors.yaml"]);
    let (runner, _observed) = ScriptedRunner::new(Verdict::Pass, Vec::new());
    let sink = Arc::new(MemoryAuditSink::new());

    let err = run_with(runner, &sink).execute(&[test_file]).unwrap_err();

    let RunError::Policy {
        violation, ..
    } = err
    else {
        panic!("expected policy violation");
    };
    assert_eq!(violation.group, "errors");
    assert_eq!(violation.rule_index, 0);
    assert_eq!(violation.missing.labels, vec!["severity"]);
    assert_eq!(violation.missing.annotations, vec!["runbook_url", "description", "summary"]);
    let event = sink.kinds().into_iter().find_map(|kind| match kind {
        RunEventKind::PolicyViolation {
            missing_labels, ..
        } => Some(missing_labels),
        _ => None,
    });
    assert_eq!(event, Some(vec!["severity".to_string()]));
}

#[test]
fn failing_tests_restore_and_carry_output() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_file(dir.path(), "rules.yaml", COMPLIANT_RULES);
    let test_file = write_test_file(dir.path(), "test.yaml", &["rules.yaml"]);
    let (runner, _observed) = ScriptedRunner::new(Verdict::Fail(1), Vec::new());
    let sink = Arc::new(MemoryAuditSink::new());

    let err = run_with(runner, &sink).execute(&[test_file]).unwrap_err();

    assert!(matches!(
        err,
        RunError::Runner(RunnerFailure::TestsFailed {
            exit_code: Some(1),
            ..
        })
    ));
    assert!(err.runner_output().unwrap().starts_with(b"FAILED:"));
    assert_eq!(fs::read(&rules).unwrap(), COMPLIANT_RULES.as_bytes());
}

#[test]
fn launch_failure_restores() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_file(dir.path(), "rules.yaml", COMPLIANT_RULES);
    let test_file = write_test_file(dir.path(), "test.yaml", &["rules.yaml"]);
    let (runner, _observed) = ScriptedRunner::new(Verdict::CannotLaunch, Vec::new());
    let sink = Arc::new(MemoryAuditSink::new());

    let err = run_with(runner, &sink).execute(&[test_file]).unwrap_err();

    assert!(matches!(err, RunError::Runner(RunnerFailure::Launch(_))));
    assert_eq!(fs::read(&rules).unwrap(), COMPLIANT_RULES.as_bytes());
    assert!(
        sink.kinds().iter().any(|kind| matches!(kind, RunEventKind::RunnerFailedToStart { .. }))
    );
}

#[test]
fn io_error_mid_rewrite_restores_earlier_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(dir.path(), "a.yaml", COMPLIANT_RULES);
    fs::create_dir(dir.path().join("b.yaml")).unwrap();
    let test_file = write_test_file(dir.path(), "test.yaml", &["a.yaml", "b.yaml"]);
    let (runner, observed) = ScriptedRunner::new(Verdict::Pass, Vec::new());
    let sink = Arc::new(MemoryAuditSink::new());

    let err = run_with(runner, &sink).execute(&[test_file]).unwrap_err();

    assert!(matches!(
        err,
        RunError::Io {
            action: IoAction::Read,
            ..
        }
    ));
    assert_eq!(observed.lock().unwrap().calls, 0);
    assert_eq!(fs::read(&first).unwrap(), COMPLIANT_RULES.as_bytes());
    assert_eq!(rewritten_paths(&sink).len(), 1);
}

#[test]
fn file_without_marker_is_untouched_and_run_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let plain = write_file(dir.path(), "plain.yaml", PLAIN_RULES);
    let test_file = write_test_file(dir.path(), "test.yaml", &["plain.yaml"]);
    let (runner, observed) = ScriptedRunner::new(Verdict::Pass, vec![plain.clone()]);
    let sink = Arc::new(MemoryAuditSink::new());

    let report = run_with(runner, &sink).execute(&[test_file]).unwrap();

    assert!(report.rewritten.is_empty());
    assert!(report.restored.is_empty());
    assert_eq!(report.skipped, vec![canonical(&plain)]);
    assert_eq!(observed.lock().unwrap().contents[0], PLAIN_RULES.as_bytes());
    assert_eq!(fs::read(&plain).unwrap(), PLAIN_RULES.as_bytes());
}

#[test]
fn shared_rule_file_is_rewritten_once_for_both_tests() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_file(dir.path(), "shared.yaml", COMPLIANT_RULES);
    let first = write_test_file(dir.path(), "first_test.yaml", &["shared.yaml"]);
    let second = write_test_file(dir.path(), "second_test.yaml", &["./shared.yaml"]);
    let (runner, observed) = ScriptedRunner::new(Verdict::Pass, Vec::new());
    let sink = Arc::new(MemoryAuditSink::new());

    let report = run_with(runner, &sink).execute(&[first.clone(), second.clone()]).unwrap();

    assert_eq!(rewritten_paths(&sink).len(), 1);
    assert_eq!(report.restored, vec![canonical(&rules)]);
    let observed = observed.lock().unwrap();
    assert_eq!(observed.calls, 1);
    assert_eq!(observed.test_files, vec![first, second]);
    assert_eq!(fs::read(&rules).unwrap(), COMPLIANT_RULES.as_bytes());
}

#[test]
fn restoration_failure_carries_prior_error() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_file(dir.path(), "nested/rules.yaml", COMPLIANT_RULES);
    let test_file = write_test_file(dir.path(), "test.yaml", &["nested/rules.yaml"]);
    let nested = dir.path().join("nested");
    let (runner, _observed) = ScriptedRunner::new(Verdict::Fail(1), Vec::new());
    let runner = runner.with_hook(Box::new(move || {
        fs::remove_dir_all(&nested).unwrap();
    }));
    let sink = Arc::new(MemoryAuditSink::new());

    let err = run_with(runner, &sink).execute(&[test_file]).unwrap_err();

    let RunError::Restoration {
        failure,
        prior,
    } = &err
    else {
        panic!("expected restoration failure");
    };
    assert_eq!(failure.failures.len(), 1);
    assert_eq!(failure.failures[0].path, canonical(dir.path()).join("nested/rules.yaml"));
    assert!(matches!(prior.as_deref(), Some(RunError::Runner(RunnerFailure::TestsFailed { .. }))));
    assert!(err.runner_output().is_some());
    assert!(!rules.exists());
    assert!(sink.kinds().iter().any(|kind| matches!(kind, RunEventKind::RestoreFailed { .. })));
}

#[test]
fn runner_panic_still_restores() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_file(dir.path(), "rules.yaml", COMPLIANT_RULES);
    let test_file = write_test_file(dir.path(), "test.yaml", &["rules.yaml"]);
    let (runner, _observed) = ScriptedRunner::new(Verdict::Panic, Vec::new());
    let sink = Arc::new(MemoryAuditSink::new());
    let run = run_with(runner, &sink);

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| run.execute(&[test_file])));

    assert!(outcome.is_err());
    assert_eq!(fs::read(&rules).unwrap(), COMPLIANT_RULES.as_bytes());
}

#[test]
fn check_validates_without_writing_or_testing() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write_file(dir.path(), "rules.yaml", COMPLIANT_RULES);
    let test_file = write_test_file(dir.path(), "test.yaml", &["rules.yaml"]);
    let (runner, observed) = ScriptedRunner::new(Verdict::Pass, Vec::new());
    let sink = Arc::new(MemoryAuditSink::new());

    let report = run_with(runner, &sink).check(&[test_file]).unwrap();

    assert_eq!(report.rule_files, vec![canonical(&rules)]);
    assert_eq!(report.rules, 2);
    assert_eq!(observed.lock().unwrap().calls, 0);
    assert!(rewritten_paths(&sink).is_empty());
    assert_eq!(fs::read(&rules).unwrap(), COMPLIANT_RULES.as_bytes());
}

#[cfg(unix)]
#[test]
fn command_runner_sees_stripped_file() {
    use rule_gate_core::CommandTestRunner;

    let dir = tempfile::tempdir().unwrap();
    let rules = write_file(dir.path(), "rules.yaml", COMPLIANT_RULES);
    let test_file = write_test_file(dir.path(), "test.yaml", &["rules.yaml"]);
    let script = format!(
        "if grep -q apiVersion '{path}'; then echo envelope; exit 1; fi; head -n 1 '{path}'",
        path = rules.display()
    );
    let runner = CommandTestRunner::new(vec![
        "sh".to_string(),
        "-c".to_string(),
        script,
        "runner".to_string(),
    ])
    .unwrap();
    let sink = Arc::new(MemoryAuditSink::new());

    let report = run_with(runner, &sink).execute(&[test_file]).unwrap();

    assert_eq!(report.output, b"groups:\n");
    assert_eq!(fs::read(&rules).unwrap(), COMPLIANT_RULES.as_bytes());
}
