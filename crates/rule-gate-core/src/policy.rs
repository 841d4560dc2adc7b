// crates/rule-gate-core/src/policy.rs
// ============================================================================
// Module: Metadata Policy
// Description: Mandatory label and annotation checks for rule definitions.
// Purpose: Decide whether a rule carries the metadata operators rely on.
// Dependencies: crate::model, thiserror
// ============================================================================

//! ## Overview
//! A [`MetadataPolicy`] holds the mandatory label and annotation names and the
//! [`PolicyScope`] it applies to. [`MetadataPolicy::inspect`] is pure: it
//! computes the set difference between each mandatory list and the keys on
//! the rule and reports every missing name. [`inspect_document`] walks a rule
//! file in document order and stops at the first non-compliant rule.
//!
//! ## Invariants
//! - Labels are checked against `labels`, annotations against `annotations`.
//! - Missing names are reported in the configured order.
//! - Only the first violation of a document is ever reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::model::RuleDefinition;
use crate::model::RuleFileEnvelope;
use crate::model::RuleKind;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Labels every rule must carry by default.
pub const DEFAULT_REQUIRED_LABELS: &[&str] = &["owner", "severity"];
/// Annotations every rule must carry by default.
pub const DEFAULT_REQUIRED_ANNOTATIONS: &[&str] = &["runbook_url", "description", "summary"];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Which rules the policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyScope {
    /// Recording and alerting rules are inspected identically.
    #[default]
    AllRules,
    /// Only alerting rules are inspected; recording rules always pass.
    AlertingOnly,
}

impl PolicyScope {
    /// Returns true when rules of `kind` are subject to inspection.
    #[must_use]
    pub const fn covers(self, kind: RuleKind) -> bool {
        match self {
            Self::AllRules => true,
            Self::AlertingOnly => matches!(kind, RuleKind::Alerting),
        }
    }
}

/// Mandatory metadata a rule lacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingMetadata {
    /// Missing label names, in policy order.
    pub labels: Vec<String>,
    /// Missing annotation names, in policy order.
    pub annotations: Vec<String>,
}

impl MissingMetadata {
    /// Returns true when nothing is missing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.annotations.is_empty()
    }
}

impl fmt::Display for MissingMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if !self.labels.is_empty() {
            parts.push(format!("missing mandatory labels: {}", self.labels.join(", ")));
        }
        if !self.annotations.is_empty() {
            parts.push(format!("missing mandatory annotations: {}", self.annotations.join(", ")));
        }
        f.write_str(&parts.join("; "))
    }
}

/// Outcome of inspecting a single rule.
pub type PolicyResult = Result<(), MissingMetadata>;

/// First non-compliant rule found in a rule document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} rule '{rule}' in group '{group}': {missing}")]
pub struct PolicyViolation {
    /// Group containing the rule.
    pub group: String,
    /// Zero-based position of the rule within its group.
    pub rule_index: usize,
    /// Alert or record name.
    pub rule: String,
    /// Rule kind.
    pub kind: RuleKind,
    /// Mandatory names the rule lacks.
    pub missing: MissingMetadata,
}

/// Mandatory label and annotation policy.
///
/// # Invariants
/// - Required name lists contain no duplicates when built from validated config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPolicy {
    /// Mandatory label names.
    required_labels: Vec<String>,
    /// Mandatory annotation names.
    required_annotations: Vec<String>,
    /// Rules the policy applies to.
    scope: PolicyScope,
}

impl Default for MetadataPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_REQUIRED_LABELS.iter().map(ToString::to_string).collect(),
            DEFAULT_REQUIRED_ANNOTATIONS.iter().map(ToString::to_string).collect(),
            PolicyScope::AllRules,
        )
    }
}

impl MetadataPolicy {
    /// Creates a policy from explicit name lists.
    #[must_use]
    pub const fn new(
        required_labels: Vec<String>,
        required_annotations: Vec<String>,
        scope: PolicyScope,
    ) -> Self {
        Self {
            required_labels,
            required_annotations,
            scope,
        }
    }

    /// Returns the mandatory label names.
    #[must_use]
    pub fn required_labels(&self) -> &[String] {
        &self.required_labels
    }

    /// Returns the mandatory annotation names.
    #[must_use]
    pub fn required_annotations(&self) -> &[String] {
        &self.required_annotations
    }

    /// Returns the policy scope.
    #[must_use]
    pub const fn scope(&self) -> PolicyScope {
        self.scope
    }

    /// Inspects one rule against the policy.
    ///
    /// Rules outside the policy scope are compliant without inspection.
    ///
    /// # Errors
    ///
    /// Returns [`MissingMetadata`] listing every absent label and annotation.
    pub fn inspect(&self, rule: &RuleDefinition) -> PolicyResult {
        if let Some(kind) = rule.kind()
            && !self.scope.covers(kind)
        {
            return Ok(());
        }
        let missing = MissingMetadata {
            labels: missing_keys(&self.required_labels, &rule.labels),
            annotations: missing_keys(&self.required_annotations, &rule.annotations),
        };
        if missing.is_empty() { Ok(()) } else { Err(missing) }
    }
}

// ============================================================================
// SECTION: Document Inspection
// ============================================================================

/// Inspects every rule of a document in order, stopping at the first violation.
///
/// Returns the number of rules inspected when the document is compliant.
///
/// # Errors
///
/// Returns the [`PolicyViolation`] for the first non-compliant rule.
pub fn inspect_document(
    policy: &MetadataPolicy,
    envelope: &RuleFileEnvelope,
) -> Result<usize, PolicyViolation> {
    let mut inspected = 0usize;
    for group in envelope.groups() {
        for (rule_index, rule) in group.rules.iter().enumerate() {
            policy.inspect(rule).map_err(|missing| PolicyViolation {
                group: group.name.clone(),
                rule_index,
                rule: rule.name().to_string(),
                kind: rule.kind().unwrap_or(RuleKind::Alerting),
                missing,
            })?;
            inspected += 1;
        }
    }
    Ok(inspected)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the required names absent from `present`, in required order.
fn missing_keys(required: &[String], present: &BTreeMap<String, String>) -> Vec<String> {
    required.iter().filter(|name| !present.contains_key(name.as_str())).cloned().collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
