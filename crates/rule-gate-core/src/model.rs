// crates/rule-gate-core/src/model.rs
// ============================================================================
// Module: Rule Document Model
// Description: Typed view of rule-group documents used for policy inspection.
// Purpose: Parse rule files strictly enough to walk every rule in order.
// Dependencies: serde, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! Rule files wrap a `groups` list under the [`MARKER_FIELD`] of an outer
//! envelope that also carries `apiVersion`, `kind`, and `metadata`. The typed
//! model only represents what inspection needs; envelope fields are ignored
//! here and preserved by the untyped path in [`crate::strip`].
//!
//! ## Invariants
//! - Group and rule order matches document order.
//! - Every parsed rule sets exactly one of `record` or `alert`.
//! - A document without the marker field or without groups parses to an
//!   empty rule set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::duration::RuleDuration;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Envelope field holding the rule groups forwarded to the test runner.
pub const MARKER_FIELD: &str = "spec";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing or stripping a rule document.
#[derive(Debug, Error)]
pub enum ModelError {
    /// YAML syntax or shape error.
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Document root is neither a mapping nor empty.
    #[error("document root must be a mapping")]
    NotAMapping,
    /// Rule sets both or neither of `record` and `alert`.
    #[error("rule {index} in group '{group}' must set exactly one of record or alert")]
    AmbiguousKind {
        /// Owning group name.
        group: String,
        /// Zero-based rule position within the group.
        index: usize,
    },
    /// The marker subtree could not be re-serialized.
    #[error("failed to serialize marker section: {0}")]
    Serialize(serde_yaml::Error),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Rule kind derived from which name field is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Rule with an `alert` name.
    Alerting,
    /// Rule with a `record` name.
    Recording,
}

impl RuleKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alerting => "alerting",
            Self::Recording => "recording",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One alerting or recording rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleDefinition {
    /// Recorded series name (recording rules).
    #[serde(default)]
    pub record: Option<String>,
    /// Alert name (alerting rules).
    #[serde(default)]
    pub alert: Option<String>,
    /// Rule expression.
    #[serde(default)]
    pub expr: String,
    /// Pending duration before an alert fires.
    #[serde(default, rename = "for")]
    pub for_duration: Option<RuleDuration>,
    /// Duration an alert keeps firing after its condition clears.
    #[serde(default)]
    pub keep_firing_for: Option<RuleDuration>,
    /// Label name to value mapping.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotation name to value mapping.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl RuleDefinition {
    /// Returns the rule kind, or `None` when both or neither names are set.
    #[must_use]
    pub const fn kind(&self) -> Option<RuleKind> {
        match (&self.alert, &self.record) {
            (Some(_), None) => Some(RuleKind::Alerting),
            (None, Some(_)) => Some(RuleKind::Recording),
            _ => None,
        }
    }

    /// Returns the alert or record name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.alert.as_deref().or(self.record.as_deref()).unwrap_or_default()
    }
}

/// Named, ordered set of rules evaluated together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleGroup {
    /// Group name.
    pub name: String,
    /// Evaluation interval override.
    #[serde(default)]
    pub interval: Option<RuleDuration>,
    /// Maximum number of alerts or series the group may produce.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Rules in evaluation order.
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// The rule groups carried under the marker field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleGroupDocument {
    /// Groups in document order.
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

/// Outer envelope of a rule file as seen by the typed parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleFileEnvelope {
    /// Rule groups under the marker field.
    #[serde(default)]
    pub spec: Option<RuleGroupDocument>,
}

impl RuleFileEnvelope {
    /// Returns the rule groups, empty when the marker field is absent.
    #[must_use]
    pub fn groups(&self) -> &[RuleGroup] {
        match &self.spec {
            Some(document) => &document.groups,
            None => &[],
        }
    }

    /// Returns the total number of rules across all groups.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.groups().iter().map(|group| group.rules.len()).sum()
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Deserializes the first YAML document of `bytes`; later documents are ignored.
///
/// Returns `None` for an empty stream.
pub(crate) fn first_document<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>, ModelError> {
    serde_yaml::Deserializer::from_slice(bytes)
        .next()
        .map(T::deserialize)
        .transpose()
        .map_err(ModelError::from)
}

/// Parses rule file bytes into the typed envelope.
///
/// # Errors
///
/// Returns [`ModelError`] when the YAML is malformed, a duration is invalid,
/// or a rule does not set exactly one of `record` or `alert`.
pub fn parse_typed(bytes: &[u8]) -> Result<RuleFileEnvelope, ModelError> {
    let envelope = first_document::<Option<RuleFileEnvelope>>(bytes)?.flatten();
    let envelope = envelope.unwrap_or_default();
    for group in envelope.groups() {
        for (index, rule) in group.rules.iter().enumerate() {
            if rule.kind().is_none() {
                return Err(ModelError::AmbiguousKind {
                    group: group.name.clone(),
                    index,
                });
            }
        }
    }
    Ok(envelope)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
