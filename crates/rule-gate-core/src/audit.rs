// crates/rule-gate-core/src/audit.rs
// ============================================================================
// Module: Run Audit Logging
// Description: Structured events emitted while a rule test run progresses.
// Purpose: Emit JSON-line diagnostics without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every observable step of a run is reported as a [`RunAuditEvent`]
//! through a [`RunAuditSink`]. Sinks serialize events as JSON lines so they
//! can be routed to any log pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Event payloads, tagged by `event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEventKind {
    /// A test-definition file was parsed.
    TestFileLoaded {
        /// Test-definition path.
        path: String,
        /// Number of rule files it references.
        rule_files: usize,
    },
    /// A rule file passed policy inspection.
    RuleFileInspected {
        /// Rule file path.
        path: String,
        /// Number of rules inspected.
        rules: usize,
    },
    /// Label names carried by one inspected rule.
    RuleLabels {
        /// Rule file path.
        path: String,
        /// Group containing the rule.
        group: String,
        /// Alert or record name.
        rule: String,
        /// Label names present on the rule.
        labels: Vec<String>,
    },
    /// A rule file was left untouched.
    RuleFileSkipped {
        /// Rule file path.
        path: String,
        /// Skip reason label.
        reason: &'static str,
    },
    /// A rule file was replaced with its stripped form.
    RuleFileRewritten {
        /// Rule file path.
        path: String,
        /// Size of the original content.
        original_bytes: usize,
        /// Size of the stripped content.
        stripped_bytes: usize,
    },
    /// A rule failed the metadata policy.
    PolicyViolation {
        /// Rule file path.
        path: String,
        /// Group containing the rule.
        group: String,
        /// Alert or record name.
        rule: String,
        /// Missing label names.
        missing_labels: Vec<String>,
        /// Missing annotation names.
        missing_annotations: Vec<String>,
    },
    /// The external runner is about to start.
    RunnerStarted {
        /// Program and fixed arguments.
        command: Vec<String>,
        /// Number of test-definition paths passed.
        test_files: usize,
    },
    /// The external runner exited.
    RunnerFinished {
        /// Whether the runner reported success.
        success: bool,
        /// Exit code when the process exited normally.
        exit_code: Option<i32>,
        /// Size of the captured output.
        output_bytes: usize,
    },
    /// The external runner could not be started.
    RunnerFailedToStart {
        /// Launch error message.
        error: String,
    },
    /// A rule file was restored to its original content.
    FileRestored {
        /// Rule file path.
        path: String,
    },
    /// Restoring a rule file failed.
    RestoreFailed {
        /// Rule file path.
        path: String,
        /// Write error message.
        error: String,
    },
    /// An unwinding run left rule files unrestored.
    RestoreIncomplete {
        /// Number of files restored.
        restored: usize,
        /// Paths still holding stripped content.
        unrestored: Vec<String>,
    },
}

/// Timestamped run audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunAuditEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event payload.
    #[serde(flatten)]
    pub kind: RunEventKind,
}

impl RunAuditEvent {
    /// Creates a new audit event stamped with the current time.
    #[must_use]
    pub fn new(kind: RunEventKind) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            timestamp_ms,
            kind,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for run events.
pub trait RunAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &RunAuditEvent);

    /// Stamps and records an event payload.
    fn emit(&self, kind: RunEventKind) {
        self.record(&RunAuditEvent::new(kind));
    }
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl RunAuditSink for StderrAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunAuditSink for FileAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl RunAuditSink for NoopAuditSink {
    fn record(&self, _event: &RunAuditEvent) {}
}

/// Audit sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in emission order.
    events: Mutex<Vec<RunAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded event payloads in emission order.
    #[must_use]
    pub fn kinds(&self) -> Vec<RunEventKind> {
        self.events
            .lock()
            .map(|events| events.iter().map(|event| event.kind.clone()).collect())
            .unwrap_or_default()
    }
}

impl RunAuditSink for MemoryAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
