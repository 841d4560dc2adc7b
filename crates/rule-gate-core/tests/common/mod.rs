// crates/rule-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Rule Gate Test Fixtures
// Description: Shared rule documents and a scripted test runner.
// Purpose: Drive run transactions without an external rule tester.
// ============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Shared fixtures are not used by every test binary."
)]

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rule_gate_core::RunnerError;
use rule_gate_core::RunnerOutcome;
use rule_gate_core::TestRunner;

/// Compliant rule file wrapped in a `PrometheusRule` envelope.
pub const COMPLIANT_RULES: &str = "\
# latency alerts, owned by sre\r
apiVersion: monitoring.coreos.com/v1\r
kind: PrometheusRule\r
metadata:\r
  name: latency\r
  labels: {team: sre}\r
spec:\r
  groups:\r
    - name: latency\r
      interval: 30s\r
      rules:\r
        - alert: HighLatency\r
          expr: histogram_quantile(0.99, rate(latency_bucket[5m])) > 1\r
          for: 10m\r
          labels:\r
            owner: sre\r
            severity: page\r
          annotations:\r
            runbook_url: \"https://runbooks.example/latency\"\r
            description: p99 latency above one second\r
            summary: high latency\r
        - record: job:latency:p99\r
          expr: histogram_quantile(0.99, rate(latency_bucket[5m]))\r
          labels: {owner: sre, severity: none}\r
          annotations: {runbook_url: none, description: p99, summary: p99}\r
";

/// Rule file whose only alert carries nothing but an `owner` label.
pub const OWNER_ONLY_RULES: &str = "\
apiVersion: monitoring.coreos.com/v1
kind: PrometheusRule
spec:
  groups:
    - name: errors
      rules:
        - alert: ErrorBudgetBurn
          expr: rate(errors_total[5m]) > 0.1
          labels:
            owner: x
";

/// Plain rule-group file with no envelope.
pub const PLAIN_RULES: &str = "\
groups:
  - name: plain
    rules:
      - record: job:up:sum
        expr: sum(up)
";

/// Writes `body` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, body).unwrap();
    path
}

/// Writes a test-definition file referencing `rule_files`.
pub fn write_test_file(dir: &Path, name: &str, rule_files: &[&str]) -> PathBuf {
    let list = rule_files.iter().map(|file| format!("  - {file}\n")).collect::<String>();
    let body = format!("rule_files:\n{list}evaluation_interval: 1m\ntests: []\n");
    write_file(dir, name, &body)
}

/// Verdict a [`ScriptedRunner`] returns.
#[derive(Debug, Clone, Copy)]
pub enum Verdict {
    /// Exit code 0.
    Pass,
    /// Non-zero exit code.
    Fail(i32),
    /// Launch error.
    CannotLaunch,
    /// Panic inside the runner.
    Panic,
}

/// What a [`ScriptedRunner`] saw while it ran.
#[derive(Debug, Default)]
pub struct Observed {
    /// Number of invocations.
    pub calls: usize,
    /// Test files passed on the last invocation.
    pub test_files: Vec<PathBuf>,
    /// Content of each watched file during the last invocation.
    pub contents: Vec<Vec<u8>>,
}

/// Hook run while the runner is "executing".
pub type Hook = Box<dyn Fn() + Send + Sync>;

/// Test runner that records its inputs and returns a fixed verdict.
pub struct ScriptedRunner {
    /// Verdict to return.
    verdict: Verdict,
    /// Files whose content is captured during the run.
    watched: Vec<PathBuf>,
    /// Optional side effect performed during the run.
    hook: Option<Hook>,
    /// Shared observations.
    observed: Arc<Mutex<Observed>>,
}

impl ScriptedRunner {
    /// Creates a runner and returns the handle to its observations.
    pub fn new(verdict: Verdict, watched: Vec<PathBuf>) -> (Self, Arc<Mutex<Observed>>) {
        let observed = Arc::new(Mutex::new(Observed::default()));
        let runner = Self {
            verdict,
            watched,
            hook: None,
            observed: Arc::clone(&observed),
        };
        (runner, observed)
    }

    /// Adds a side effect performed after the watched files are captured.
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hook = Some(hook);
        self
    }
}

impl TestRunner for ScriptedRunner {
    fn command(&self) -> Vec<String> {
        vec!["scripted".to_string(), "test".to_string(), "rules".to_string()]
    }

    fn run(&self, test_files: &[PathBuf]) -> Result<RunnerOutcome, RunnerError> {
        {
            let mut observed = self.observed.lock().unwrap();
            observed.calls += 1;
            observed.test_files = test_files.to_vec();
            observed.contents =
                self.watched.iter().map(|path| fs::read(path).unwrap_or_default()).collect();
        }
        if let Some(hook) = &self.hook {
            hook();
        }
        match self.verdict {
            Verdict::Pass => Ok(RunnerOutcome {
                success: true,
                exit_code: Some(0),
                output: b"SUCCESS\n".to_vec(),
            }),
            Verdict::Fail(code) => Ok(RunnerOutcome {
                success: false,
                exit_code: Some(code),
                output: b"FAILED:\n  alertname: HighLatency\n".to_vec(),
            }),
            Verdict::CannotLaunch => Err(RunnerError::Launch {
                program: "scripted".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not installed"),
            }),
            Verdict::Panic => panic!("scripted runner crashed"),
        }
    }
}
