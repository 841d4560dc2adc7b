// crates/rule-gate-cli/src/tests/exit_codes.rs
// ============================================================================
// Module: CLI Exit Code Tests
// Description: Unit tests for the run outcome to exit code mapping.
// Purpose: Keep exit codes stable for CI pipelines.
// Dependencies: rule-gate-cli exit_codes module, rule-gate-core
// ============================================================================

//! ## Overview
//! Verifies every run error class maps to its own exit code and that a
//! restoration failure is reported as such even after an earlier error.

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use rule_gate_core::DocumentKind;
use rule_gate_core::IoAction;
use rule_gate_core::MissingMetadata;
use rule_gate_core::PolicyViolation;
use rule_gate_core::RestorationFailure;
use rule_gate_core::RuleKind;
use rule_gate_core::RunError;
use rule_gate_core::RunnerError;
use rule_gate_core::RunnerFailure;
use rule_gate_core::ledger::RestoreError;

use crate::exit_codes::EXIT_IO;
use crate::exit_codes::EXIT_LAUNCH;
use crate::exit_codes::EXIT_OK;
use crate::exit_codes::EXIT_PARSE;
use crate::exit_codes::EXIT_POLICY;
use crate::exit_codes::EXIT_RESTORATION;
use crate::exit_codes::EXIT_TESTS_FAILED;
use crate::exit_codes::EXIT_USAGE;
use crate::exit_codes::exit_code_for;

/// Builds a policy violation error.
fn policy_error() -> RunError {
    RunError::Policy {
        path: PathBuf::from("rules.yaml"),
        violation: PolicyViolation {
            group: "latency".to_string(),
            rule_index: 0,
            rule: "HighLatency".to_string(),
            kind: RuleKind::Alerting,
            missing: MissingMetadata {
                labels: vec!["severity".to_string()],
                annotations: Vec::new(),
            },
        },
    }
}

/// Builds a failed-tests error with captured output.
fn tests_failed() -> RunError {
    RunError::Runner(RunnerFailure::TestsFailed {
        exit_code: Some(1),
        output: b"FAILED:\n".to_vec(),
    })
}

/// Builds a restoration failure, optionally after `prior`.
fn restoration(prior: Option<RunError>) -> RunError {
    RunError::Restoration {
        failure: RestorationFailure {
            restored: Vec::new(),
            failures: vec![RestoreError {
                path: PathBuf::from("rules.yaml"),
                source: io::Error::other("read-only file system"),
            }],
        },
        prior: prior.map(Box::new),
    }
}

#[test]
fn each_error_class_has_its_own_code() {
    let cases = [
        (policy_error(), EXIT_POLICY),
        (
            RunError::Parse {
                path: PathBuf::from("tests.yaml"),
                kind: DocumentKind::TestFile,
                message: "bad indentation".to_string(),
            },
            EXIT_PARSE,
        ),
        (
            RunError::Io {
                path: PathBuf::from("rules.yaml"),
                action: IoAction::Write,
                source: io::Error::other("disk full"),
            },
            EXIT_IO,
        ),
        (RunError::Runner(RunnerFailure::Launch(RunnerError::EmptyCommand)), EXIT_LAUNCH),
        (tests_failed(), EXIT_TESTS_FAILED),
        (restoration(None), EXIT_RESTORATION),
    ];
    for (err, expected) in &cases {
        assert_eq!(exit_code_for(err), *expected, "unexpected code for {err}");
    }
}

#[test]
fn restoration_failure_outranks_prior_error() {
    let err = restoration(Some(tests_failed()));
    assert_eq!(exit_code_for(&err), EXIT_RESTORATION);
    assert_eq!(err.runner_output(), Some(b"FAILED:\n".as_slice()));
}

#[test]
fn codes_are_distinct() {
    let codes = [
        EXIT_OK,
        EXIT_TESTS_FAILED,
        EXIT_POLICY,
        EXIT_PARSE,
        EXIT_IO,
        EXIT_LAUNCH,
        EXIT_RESTORATION,
        EXIT_USAGE,
    ];
    let unique: BTreeSet<u8> = codes.iter().copied().collect();
    assert_eq!(unique.len(), codes.len());
}
