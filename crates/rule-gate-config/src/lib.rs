// crates/rule-gate-config/src/lib.rs
// ============================================================================
// Module: Rule Gate Config Library
// Description: Canonical config model and validation for rule-gate.toml.
// Purpose: Single source of truth for rule-gate.toml semantics.
// Dependencies: rule-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `rule-gate-config` defines the configuration model for Rule Gate: the
//! mandatory metadata policy, the external runner command, input size limits
//! and audit routing. Validation is strict and fails closed; the builders on
//! [`RuleGateConfig`] turn a validated config into core runtime values.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
