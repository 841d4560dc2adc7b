// crates/rule-gate-config/src/config.rs
// ============================================================================
// Module: Rule Gate Configuration
// Description: Configuration loading and validation for Rule Gate.
// Purpose: Turn rule-gate.toml into a validated policy, runner and sink.
// Dependencies: rule-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits
//! and validated before any run starts. Every section is optional; an empty
//! file, or a missing default file, yields the built-in policy with
//! `promtool test rules` as the runner.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use rule_gate_core::CommandTestRunner;
use rule_gate_core::FileAuditSink;
use rule_gate_core::MetadataPolicy;
use rule_gate_core::NoopAuditSink;
use rule_gate_core::PolicyScope;
use rule_gate_core::RewriteLimits;
use rule_gate_core::RunAuditSink;
use rule_gate_core::StderrAuditSink;
use rule_gate_core::policy::DEFAULT_REQUIRED_ANNOTATIONS;
use rule_gate_core::policy::DEFAULT_REQUIRED_LABELS;
use rule_gate_core::rewrite::DEFAULT_MAX_RULE_FILE_BYTES;
use rule_gate_core::rewrite::DEFAULT_MAX_TEST_FILE_BYTES;
use rule_gate_core::runner::DEFAULT_RUNNER_ARGS;
use rule_gate_core::runner::DEFAULT_RUNNER_PROGRAM;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "rule-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "RULE_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of mandatory labels or annotations.
pub(crate) const MAX_REQUIRED_NAMES: usize = 64;
/// Maximum length of a mandatory label or annotation name.
pub(crate) const MAX_NAME_LENGTH: usize = 128;
/// Maximum number of runner command parts.
pub(crate) const MAX_RUNNER_ARGS: usize = 64;
/// Hard cap for `limits.max_rule_file_bytes`.
pub(crate) const MAX_RULE_FILE_BYTES_CAP: usize = 64 * 1024 * 1024;
/// Hard cap for `limits.max_test_file_bytes`.
pub(crate) const MAX_TEST_FILE_BYTES_CAP: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Rule Gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleGateConfig {
    /// Metadata policy configuration.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// External runner configuration.
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Input size limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Audit event routing.
    #[serde(default)]
    pub audit: AuditConfig,
    /// File the configuration was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl RuleGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// An explicit `path` or `RULE_GATE_CONFIG` must name an existing file;
    /// a missing `rule-gate.toml` in the working directory yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if !explicit && err.kind() == io::ErrorKind::NotFound => {
                let mut config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.source_path = Some(resolved);
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        self.runner.validate()?;
        self.limits.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Builds the metadata policy.
    #[must_use]
    pub fn metadata_policy(&self) -> MetadataPolicy {
        MetadataPolicy::new(
            trimmed(&self.policy.required_labels),
            trimmed(&self.policy.required_annotations),
            self.policy.scope.into(),
        )
    }

    /// Builds the process-backed test runner.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the runner command is empty.
    pub fn command_runner(&self) -> Result<CommandTestRunner, ConfigError> {
        CommandTestRunner::new(self.runner.command.clone())
            .map_err(|err| ConfigError::Invalid(format!("runner.command: {err}")))
    }

    /// Returns the configured input size limits.
    #[must_use]
    pub const fn rewrite_limits(&self) -> RewriteLimits {
        RewriteLimits {
            max_rule_file_bytes: self.limits.max_rule_file_bytes,
            max_test_file_bytes: self.limits.max_test_file_bytes,
        }
    }

    /// Opens the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit log file cannot be opened.
    pub fn audit_sink(&self) -> Result<Arc<dyn RunAuditSink>, ConfigError> {
        match (self.audit.sink, &self.audit.path) {
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::File, Some(path)) => {
                let sink = FileAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(format!("audit.path: {err}")))?;
                Ok(Arc::new(sink))
            }
            (AuditSinkKind::File, None) => Err(ConfigError::Invalid(
                "audit.path is required when audit.sink = \"file\"".to_string(),
            )),
        }
    }
}

/// Mandatory metadata policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Label names every covered rule must carry.
    #[serde(default = "default_required_labels")]
    pub required_labels: Vec<String>,
    /// Annotation names every covered rule must carry.
    #[serde(default = "default_required_annotations")]
    pub required_annotations: Vec<String>,
    /// Rules the policy applies to.
    #[serde(default)]
    pub scope: PolicyScopeConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            required_labels: default_required_labels(),
            required_annotations: default_required_annotations(),
            scope: PolicyScopeConfig::default(),
        }
    }
}

impl PolicyConfig {
    /// Validates the mandatory name lists.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_names("policy.required_labels", &self.required_labels)?;
        validate_names("policy.required_annotations", &self.required_annotations)
    }
}

/// Policy scope as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyScopeConfig {
    /// Inspect recording and alerting rules.
    #[default]
    All,
    /// Inspect alerting rules only.
    Alerting,
}

impl From<PolicyScopeConfig> for PolicyScope {
    fn from(value: PolicyScopeConfig) -> Self {
        match value {
            PolicyScopeConfig::All => Self::AllRules,
            PolicyScopeConfig::Alerting => Self::AlertingOnly,
        }
    }
}

/// External runner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Program followed by the arguments placed before the test files.
    #[serde(default = "default_runner_command")]
    pub command: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: default_runner_command(),
        }
    }
}

impl RunnerConfig {
    /// Validates the runner command.
    fn validate(&self) -> Result<(), ConfigError> {
        let Some(program) = self.command.first() else {
            return Err(ConfigError::Invalid("runner.command must be non-empty".to_string()));
        };
        if program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "runner.command program must be non-empty".to_string(),
            ));
        }
        if self.command.len() > MAX_RUNNER_ARGS {
            return Err(ConfigError::Invalid("runner.command has too many arguments".to_string()));
        }
        validate_path_string("runner.command program", program)
    }
}

/// Input size limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum rule file size in bytes.
    #[serde(default = "default_max_rule_file_bytes")]
    pub max_rule_file_bytes: usize,
    /// Maximum test-definition file size in bytes.
    #[serde(default = "default_max_test_file_bytes")]
    pub max_test_file_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rule_file_bytes: default_max_rule_file_bytes(),
            max_test_file_bytes: default_max_test_file_bytes(),
        }
    }
}

impl LimitsConfig {
    /// Validates limits against their hard caps.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_limit(
            "limits.max_rule_file_bytes",
            self.max_rule_file_bytes,
            MAX_RULE_FILE_BYTES_CAP,
        )?;
        validate_limit(
            "limits.max_test_file_bytes",
            self.max_test_file_bytes,
            MAX_TEST_FILE_BYTES_CAP,
        )
    }
}

/// Audit event destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
    /// Discard events.
    None,
}

/// Audit event routing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Destination for audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates sink and path consistency.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => Err(ConfigError::Invalid(
                "audit.path is required when audit.sink = \"file\"".to_string(),
            )),
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (_, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid when audit.sink = \"file\"".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path, reporting whether it was given explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a list of mandatory label or annotation names.
fn validate_names(field: &str, names: &[String]) -> Result<(), ConfigError> {
    if names.len() > MAX_REQUIRED_NAMES {
        return Err(ConfigError::Invalid(format!("{field} has too many entries")));
    }
    let mut seen: Vec<&str> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid(format!("{field} entries must be non-empty")));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} entry too long: {name}")));
        }
        if !is_label_name(name) {
            return Err(ConfigError::Invalid(format!("{field} entry is not a valid name: {name}")));
        }
        if seen.contains(&name) {
            return Err(ConfigError::Invalid(format!("{field} contains duplicate entry: {name}")));
        }
        seen.push(name);
    }
    Ok(())
}

/// Returns true for names matching `[a-zA-Z_][a-zA-Z0-9_]*`.
fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Validates a size limit against zero and its hard cap.
fn validate_limit(field: &str, value: usize, cap: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
    }
    if value > cap {
        return Err(ConfigError::Invalid(format!("{field} must be at most {cap}")));
    }
    Ok(())
}

/// Returns trimmed copies of validated names.
fn trimmed(names: &[String]) -> Vec<String> {
    names.iter().map(|name| name.trim().to_string()).collect()
}

/// Default mandatory labels.
fn default_required_labels() -> Vec<String> {
    DEFAULT_REQUIRED_LABELS.iter().map(ToString::to_string).collect()
}

/// Default mandatory annotations.
fn default_required_annotations() -> Vec<String> {
    DEFAULT_REQUIRED_ANNOTATIONS.iter().map(ToString::to_string).collect()
}

/// Default runner command.
fn default_runner_command() -> Vec<String> {
    std::iter::once(DEFAULT_RUNNER_PROGRAM)
        .chain(DEFAULT_RUNNER_ARGS.iter().copied())
        .map(ToString::to_string)
        .collect()
}

/// Default rule file size limit.
const fn default_max_rule_file_bytes() -> usize {
    DEFAULT_MAX_RULE_FILE_BYTES
}

/// Default test-definition file size limit.
const fn default_max_test_file_bytes() -> usize {
    DEFAULT_MAX_TEST_FILE_BYTES
}

// ============================================================================
// SECTION: Tests
// ============================================================================
