//! Configuration schema definitions for twrun.
//!
//! # Schema Overview
//!
//! ```text
//! Config (root)
//! ├── ServerConfig          - Execution server URL and forwarded base URL
//! ├── ExecutionTarget       - What to run (file, folder or test case)
//! ├── ExecutionConfig       - Browser, step delay, screenshots, auto-healing
//! ├── RbtConfig             - Risk-based testing priorities and labels
//! ├── ReportConfig          - Report root, prefix, snapshot frequency
//! └── TimingConfig          - Polling cadence, retry budget, cooldowns
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure for twrun.
///
/// # TOML Structure
///
/// ```toml
/// [server]
/// url = "http://localhost:8888"
///
/// [target]
/// type = "file_path"
/// file_path = "C:/scripts/login.twizx"
///
/// [execution]
/// browser = "Google Chrome"
///
/// [report]
/// root = "reports"
/// frequency = 10
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Execution server location.
    pub server: ServerConfig,

    /// The artifact to execute.
    pub target: ExecutionTarget,

    /// Execution parameters pushed to the server before the run starts.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Risk-based testing settings.
    #[serde(default)]
    pub rbt: RbtConfig,

    /// Report output settings.
    pub report: ReportConfig,

    /// Lifecycle timing (optional, has defaults).
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Execution server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// URL of the execution server, e.g. `http://host:8888/`.
    ///
    /// A trailing `/` is added if missing.
    pub url: String,

    /// Base URL of the application under test.
    ///
    /// Never called by twrun; forwarded to the server as a run parameter.
    pub base_url: Option<String>,
}

/// Which locator of an [`ExecutionTarget`] is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Run a single script file.
    #[default]
    FilePath,
    /// Run every script in a folder.
    FolderPath,
    /// Run one test case from a script file.
    TestCase,
}

/// Identifies what to run on the execution server.
///
/// Exactly one locator is meaningful for a given [`TargetKind`]; the others
/// may be present and are ignored. A `test_case` target loads `file_path`
/// and scopes the run to `test_case`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExecutionTarget {
    #[serde(rename = "type", default)]
    pub kind: TargetKind,
    pub file_path: Option<String>,
    pub folder_path: Option<String>,
    pub test_case: Option<String>,
}

impl ExecutionTarget {
    /// Convenience constructor for a single script file.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::FilePath,
            file_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// The reference sent to the server's load route.
    pub fn load_reference(&self) -> &str {
        let locator = match self.kind {
            TargetKind::FilePath | TargetKind::TestCase => &self.file_path,
            TargetKind::FolderPath => &self.folder_path,
        };
        locator.as_deref().unwrap_or_default()
    }

    /// The test case the run is scoped to, if any.
    pub fn test_object(&self) -> Option<&str> {
        match self.kind {
            TargetKind::TestCase => self.test_case.as_deref(),
            _ => None,
        }
    }
}

/// Execution parameters.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `browser` | `"Google Chrome"` |
/// | `step_interval` | None (sent as 0) |
/// | `capture_failure_screenshot` | false |
/// | `capture_condition_failure_screenshot` | false |
/// | `auto_healing` | false |
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_browser")]
    pub browser: String,

    /// Delay between steps, in seconds.
    pub step_interval: Option<u64>,

    /// Capture a screenshot when a step fails.
    #[serde(default)]
    pub capture_failure_screenshot: bool,

    /// Capture a screenshot when a condition check fails.
    #[serde(default)]
    pub capture_condition_failure_screenshot: bool,

    #[serde(default)]
    pub auto_healing: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            browser: default_browser(),
            step_interval: None,
            capture_failure_screenshot: false,
            capture_condition_failure_screenshot: false,
            auto_healing: false,
        }
    }
}

fn default_browser() -> String {
    "Google Chrome".to_string()
}

/// Risk-based testing settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RbtConfig {
    #[serde(default)]
    pub priority_high: bool,
    #[serde(default)]
    pub priority_medium: bool,
    #[serde(default)]
    pub priority_low: bool,

    /// Run only the test cases carrying `labels`.
    #[serde(default)]
    pub label_execution: bool,

    /// Comma-separated label set.
    pub labels: Option<String>,
}

impl RbtConfig {
    /// Risk-based testing is on when any priority is selected.
    pub fn enabled(&self) -> bool {
        self.priority_high || self.priority_medium || self.priority_low
    }
}

/// Report output settings.
///
/// # Example
///
/// ```toml
/// [report]
/// root = "reports"
/// prefix = "nightly"
/// frequency = 10
/// settle_interval_ms = 5000
/// template_dir = "ReportTemplate"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Directory under which run directories are created.
    pub root: PathBuf,

    /// Optional prefix directory for run directories.
    pub prefix: Option<String>,

    /// Take an interim report snapshot every `frequency` percent.
    ///
    /// Default: 10
    #[serde(default = "default_frequency")]
    pub frequency: u32,

    /// Wait after the run ends before taking the final snapshot, in ms.
    ///
    /// Default: 5000
    #[serde(default = "default_settle_interval")]
    pub settle_interval_ms: u64,

    /// Report template copied into every run directory.
    ///
    /// Default: `"ReportTemplate"`
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,
}

fn default_frequency() -> u32 {
    10
}

fn default_settle_interval() -> u64 {
    5000
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("ReportTemplate")
}

impl ReportConfig {
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }
}

/// Timing of the run lifecycle.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `poll_interval_ms` | 5000 |
/// | `retry_interval_ms` | 2000 |
/// | `max_poll_failures` | 5 |
/// | `restart_cooldown_secs` | 180 (3 minutes) |
/// | `template_settle_ms` | 2000 |
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Delay between progress polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Delay before re-polling after a failed poll.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,

    /// Consecutive poll failures after which the run is abandoned.
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: u32,

    /// Wait after a server restart before retrying acquisition.
    #[serde(default = "default_restart_cooldown")]
    pub restart_cooldown_secs: u64,

    /// Wait after copying the report template.
    #[serde(default = "default_template_settle")]
    pub template_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            retry_interval_ms: default_retry_interval(),
            max_poll_failures: default_max_poll_failures(),
            restart_cooldown_secs: default_restart_cooldown(),
            template_settle_ms: default_template_settle(),
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn restart_cooldown(&self) -> Duration {
        Duration::from_secs(self.restart_cooldown_secs)
    }

    pub fn template_settle(&self) -> Duration {
        Duration::from_millis(self.template_settle_ms)
    }
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_retry_interval() -> u64 {
    2000
}

fn default_max_poll_failures() -> u32 {
    5
}

fn default_restart_cooldown() -> u64 {
    180 // 3 minutes
}

fn default_template_settle() -> u64 {
    2000
}
