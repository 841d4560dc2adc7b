// crates/rule-gate-core/src/test_file.rs
// ============================================================================
// Module: Test Definitions
// Description: Parsing of test-definition files and rule file resolution.
// Purpose: Turn the run's test inputs into one ordered set of rule files.
// Dependencies: crate::audit, crate::files, serde, serde_yaml
// ============================================================================

//! ## Overview
//! A test-definition file names the rule files it exercises under
//! `rule_files`; every other field belongs to the external runner and is
//! ignored here. Relative entries resolve against the test file's directory.
//! [`plan_rule_files`] loads every test input before anything is rewritten and
//! returns the union of their rule files in first-seen order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::audit::RunAuditSink;
use crate::audit::RunEventKind;
use crate::error::DocumentKind;
use crate::error::IoAction;
use crate::error::RunError;
use crate::files::read_bytes_with_limit;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Fields of a test-definition file this crate needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TestDefinition {
    /// Rule file paths, relative to the test file unless absolute.
    #[serde(default)]
    pub rule_files: Vec<String>,
}

impl TestDefinition {
    /// Parses test-definition bytes; an empty document has no rule files.
    ///
    /// # Errors
    ///
    /// Returns the YAML error when the document is malformed.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        let definition: Option<Self> = serde_yaml::from_slice(bytes)?;
        Ok(definition.unwrap_or_default())
    }
}

/// Inputs of one run after every test definition was loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFilePlan {
    /// Test-definition paths, in the order given.
    pub test_files: Vec<PathBuf>,
    /// Resolved rule file paths without duplicates, in first-seen order.
    pub rule_files: Vec<PathBuf>,
}

// ============================================================================
// SECTION: Planning
// ============================================================================

/// Loads every test definition and resolves the rule files they reference.
///
/// # Errors
///
/// Returns [`RunError::Io`] when a test file cannot be read or a rule file
/// cannot be resolved, and [`RunError::Parse`] for malformed test files.
pub fn plan_rule_files(
    test_files: &[PathBuf],
    max_test_file_bytes: usize,
    sink: &dyn RunAuditSink,
) -> Result<RuleFilePlan, RunError> {
    let mut rule_files: Vec<PathBuf> = Vec::new();
    for test_file in test_files {
        let bytes = read_bytes_with_limit(test_file, max_test_file_bytes).map_err(|source| {
            RunError::Io {
                path: test_file.clone(),
                action: IoAction::Read,
                source,
            }
        })?;
        let definition = TestDefinition::parse(&bytes).map_err(|err| RunError::Parse {
            path: test_file.clone(),
            kind: DocumentKind::TestFile,
            message: err.to_string(),
        })?;
        sink.emit(RunEventKind::TestFileLoaded {
            path: test_file.display().to_string(),
            rule_files: definition.rule_files.len(),
        });
        for entry in &definition.rule_files {
            let resolved = resolve_rule_file(test_file, entry)?;
            if !rule_files.contains(&resolved) {
                rule_files.push(resolved);
            }
        }
    }
    Ok(RuleFilePlan {
        test_files: test_files.to_vec(),
        rule_files,
    })
}

/// Resolves one `rule_files` entry to a canonical path.
fn resolve_rule_file(test_file: &Path, entry: &str) -> Result<PathBuf, RunError> {
    let base = test_file.parent().unwrap_or_else(|| Path::new(""));
    let joined = base.join(entry);
    fs::canonicalize(&joined).map_err(|source| RunError::Io {
        path: joined,
        action: IoAction::Resolve,
        source,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions are permitted."
    )]

    use std::fs;

    use super::TestDefinition;
    use super::plan_rule_files;
    use crate::audit::MemoryAuditSink;
    use crate::audit::NoopAuditSink;
    use crate::audit::RunEventKind;
    use crate::error::IoAction;
    use crate::error::RunError;

    #[test]
    fn parse_ignores_runner_fields() {
        let definition = TestDefinition::parse(
            b"rule_files: [a.yaml, b.yaml]\nevaluation_interval: 1m\ntests: []\n",
        )
        .unwrap();
        assert_eq!(definition.rule_files, vec!["a.yaml", "b.yaml"]);
        assert_eq!(TestDefinition::parse(b"").unwrap(), TestDefinition::default());
    }

    #[test]
    fn plan_resolves_relative_to_test_file_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("rules")).unwrap();
        fs::write(dir.path().join("rules/a.yaml"), "spec: {}\n").unwrap();
        fs::write(dir.path().join("rules/b.yaml"), "spec: {}\n").unwrap();
        let first = dir.path().join("first_test.yaml");
        let second = dir.path().join("second_test.yaml");
        fs::write(&first, "rule_files: [rules/a.yaml, rules/b.yaml]\n").unwrap();
        fs::write(&second, "rule_files: [rules/b.yaml, ./rules/a.yaml]\n").unwrap();
        let sink = MemoryAuditSink::new();
        let plan = plan_rule_files(&[first.clone(), second.clone()], 1024, &sink).unwrap();
        assert_eq!(plan.test_files, vec![first, second]);
        let root = dir.path().canonicalize().unwrap();
        assert_eq!(plan.rule_files, vec![root.join("rules/a.yaml"), root.join("rules/b.yaml")]);
        let loaded = sink
            .kinds()
            .into_iter()
            .filter(|kind| matches!(kind, RunEventKind::TestFileLoaded { .. }))
            .count();
        assert_eq!(loaded, 2);
    }

    #[test]
    fn missing_rule_file_fails_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("test.yaml");
        fs::write(&test_file, "rule_files: [absent.yaml]\n").unwrap();
        let err = plan_rule_files(&[test_file], 1024, &NoopAuditSink).unwrap_err();
        assert!(matches!(
            err,
            RunError::Io {
                action: IoAction::Resolve,
                ..
            }
        ));
    }

    #[test]
    fn malformed_test_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("test.yaml");
        fs::write(&test_file, "rule_files: {not: [a list\n").unwrap();
        let err = plan_rule_files(&[test_file], 1024, &NoopAuditSink).unwrap_err();
        assert!(matches!(err, RunError::Parse { .. }));
    }
}
