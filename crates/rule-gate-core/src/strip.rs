// crates/rule-gate-core/src/strip.rs
// ============================================================================
// Module: Rule Document Stripping
// Description: Untyped parse and envelope removal for rule files.
// Purpose: Forward rule content to the test runner without envelope fields.
// Dependencies: serde_yaml
// ============================================================================

//! ## Overview
//! Stripping keeps only the subtree under [`MARKER_FIELD`] and re-serializes
//! it as the new file content. The untyped tree is used so fields the typed
//! model does not know about (extra rule keys, vendor extensions) survive.
//! Files without the marker field are reported as [`StripOutcome::NoMarker`]
//! and must be left untouched by callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_yaml::Value;

use crate::model::MARKER_FIELD;
use crate::model::ModelError;
use crate::model::first_document;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of stripping one rule document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripOutcome {
    /// Serialized marker subtree ready to be written in place.
    Stripped(Vec<u8>),
    /// Document has no marker field; nothing to rewrite.
    NoMarker,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Parses the first document of rule file bytes into an untyped YAML tree.
///
/// # Errors
///
/// Returns [`ModelError::Yaml`] for malformed YAML and
/// [`ModelError::NotAMapping`] when the root is a scalar or sequence.
pub fn parse_untyped(bytes: &[u8]) -> Result<Value, ModelError> {
    let value = first_document::<Value>(bytes)?.unwrap_or(Value::Null);
    match value {
        Value::Mapping(_) | Value::Null => Ok(value),
        _ => Err(ModelError::NotAMapping),
    }
}

/// Extracts and serializes the marker subtree of an untyped document.
///
/// # Errors
///
/// Returns [`ModelError::Serialize`] when the subtree cannot be serialized.
pub fn strip(document: &Value) -> Result<StripOutcome, ModelError> {
    let Some(section) = document.as_mapping().and_then(|mapping| mapping.get(MARKER_FIELD)) else {
        return Ok(StripOutcome::NoMarker);
    };
    let text = serde_yaml::to_string(section).map_err(ModelError::Serialize)?;
    Ok(StripOutcome::Stripped(text.into_bytes()))
}

/// Parses and strips rule file bytes in one step.
///
/// # Errors
///
/// Returns [`ModelError`] from [`parse_untyped`] or [`strip`].
pub fn strip_bytes(bytes: &[u8]) -> Result<StripOutcome, ModelError> {
    strip(&parse_untyped(bytes)?)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
