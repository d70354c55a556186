//! Progress polling state machine.
//!
//! The monitor is split in two:
//!
//! - [`ProgressTracker`] is a pure step function. It consumes one
//!   [`PollOutcome`] per cycle and decides what to do next: notify
//!   progress, take a report snapshot, wait, or stop.
//! - [`ProgressMonitor`] drives the tracker against the server, performing
//!   the polls, waits and snapshots the tracker asks for.
//!
//! # States
//!
//! ```text
//!              poll ok (play/pause, threshold crossed)
//!   Polling ─────────────────────────────────────► ReportPending
//!     │  ▲                                               │
//!     │  └───────────────── snapshot issued ─────────────┘
//!     │
//!     ├── status "stop" ─────────────────────────► Stopped
//!     └── max_failures consecutive poll failures ► Abandoned
//! ```
//!
//! A percentage at or below the last one acted on never triggers anything,
//! and 100% never triggers a snapshot from inside the loop.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::ExecutionToken;
use crate::client::{RemoteClient, with_token};
use crate::clock::Clock;
use crate::config::Config;
use crate::report::Reporter;
use crate::report::snapshot::SnapshotWriter;

const PROGRESS_ROUTE: &str = "progress";

/// Status reported by the server's progress route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[serde(rename = "none")]
    Idle,
    Load,
    Play,
    Pause,
    Next,
    Stop,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

/// One reading of the progress route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressSnapshot {
    pub status: RunStatus,

    /// Elapsed run time as reported by the server.
    #[serde(default)]
    pub time: f64,

    /// Completion percentage, 0 to 100.
    #[serde(default)]
    pub progress: f64,
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Snapshot(ProgressSnapshot),
    /// Non-2xx answer, unreadable body, or transport failure.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Polling,
    ReportPending,
    /// The server reported `stop`.
    Stopped,
    /// Too many consecutive polls failed.
    Abandoned,
}

impl MonitorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, MonitorState::Stopped | MonitorState::Abandoned)
    }
}

/// Cadence and thresholds of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Snapshot every `frequency` percent. Must be greater than 0.
    pub frequency: u32,
    pub poll_interval: Duration,
    pub retry_interval: Duration,
    pub max_failures: u32,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            frequency: config.report.frequency,
            poll_interval: config.timing.poll_interval(),
            retry_interval: config.timing.retry_interval(),
            max_failures: config.timing.max_poll_failures,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            frequency: 10,
            poll_interval: Duration::from_secs(5),
            retry_interval: Duration::from_secs(2),
            max_failures: 5,
        }
    }
}

/// What the driver should do after a poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Continue {
        /// Percentage to announce, if progress advanced.
        progress: Option<f64>,
        /// Whether a report snapshot is due.
        snapshot: bool,
        /// Wait before the next poll.
        delay: Duration,
    },
    Finished(MonitorState),
}

/// Pure progress bookkeeping for one run.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    settings: MonitorSettings,
    state: MonitorState,
    last: f64,
    next_threshold: f64,
    failures: u32,
}

impl ProgressTracker {
    pub fn new(settings: MonitorSettings) -> Self {
        let frequency = f64::from(settings.frequency.max(1));
        Self {
            settings,
            state: MonitorState::Polling,
            last: 0.0,
            next_threshold: frequency,
            failures: 0,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Last percentage acted on.
    pub fn last_progress(&self) -> f64 {
        self.last
    }

    pub fn next_threshold(&self) -> f64 {
        self.next_threshold
    }

    /// Applies one poll outcome.
    pub fn observe(&mut self, outcome: PollOutcome) -> Step {
        if self.state.is_terminal() {
            return Step::Finished(self.state);
        }
        self.state = MonitorState::Polling;

        let snapshot = match outcome {
            PollOutcome::Failed => return self.on_failure(),
            PollOutcome::Snapshot(snapshot) => snapshot,
        };
        self.failures = 0;

        match snapshot.status {
            RunStatus::Stop => {
                self.state = MonitorState::Stopped;
                Step::Finished(self.state)
            }
            RunStatus::Play | RunStatus::Pause => self.on_progress(snapshot.progress),
            _ => Step::Continue {
                progress: None,
                snapshot: false,
                delay: self.settings.poll_interval,
            },
        }
    }

    /// Marks a pending snapshot as handed off.
    pub fn snapshot_issued(&mut self) {
        if self.state == MonitorState::ReportPending {
            self.state = MonitorState::Polling;
        }
    }

    fn on_failure(&mut self) -> Step {
        self.failures += 1;
        if self.failures >= self.settings.max_failures {
            self.state = MonitorState::Abandoned;
            return Step::Finished(self.state);
        }
        Step::Continue {
            progress: None,
            snapshot: false,
            delay: self.settings.retry_interval,
        }
    }

    fn on_progress(&mut self, progress: f64) -> Step {
        let mut announce = None;
        let mut snapshot = false;

        if progress > self.last {
            announce = Some(progress);
            if progress != 100.0 && progress >= self.next_threshold {
                snapshot = true;
                self.next_threshold += f64::from(self.settings.frequency.max(1));
                self.state = MonitorState::ReportPending;
            }
            self.last = progress;
        }

        Step::Continue {
            progress: announce,
            snapshot,
            delay: self.settings.poll_interval,
        }
    }
}

/// Polls a run until it stops or becomes unreachable.
pub struct ProgressMonitor {
    client: RemoteClient,
    clock: Arc<dyn Clock>,
    snapshots: SnapshotWriter,
    reporter: Arc<dyn Reporter>,
    settings: MonitorSettings,
}

impl ProgressMonitor {
    pub fn new(
        client: RemoteClient,
        clock: Arc<dyn Clock>,
        snapshots: SnapshotWriter,
        reporter: Arc<dyn Reporter>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            client,
            clock,
            snapshots,
            reporter,
            settings,
        }
    }

    /// Runs the poll loop to a terminal state.
    pub async fn run(&self, token: &ExecutionToken) -> MonitorState {
        let mut tracker = ProgressTracker::new(self.settings);

        loop {
            let outcome = self.poll(token).await;
            match tracker.observe(outcome) {
                Step::Finished(state) => {
                    info!("Monitoring of token {} ended: {:?}", token, state);
                    return state;
                }
                Step::Continue {
                    progress,
                    snapshot,
                    delay,
                } => {
                    if let Some(percent) = progress {
                        self.reporter.on_progress(percent).await;
                    }
                    if snapshot {
                        let percent = tracker.last_progress();
                        self.reporter.on_snapshot(percent).await;
                        if !self.snapshots.write(token).await {
                            warn!("Report snapshot at {}% was not written", percent);
                        }
                        tracker.snapshot_issued();
                    }
                    self.clock.sleep(delay).await;
                }
            }
        }
    }

    async fn poll(&self, token: &ExecutionToken) -> PollOutcome {
        let result = match self
            .client
            .get(&with_token(PROGRESS_ROUTE, token.as_str()))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                debug!("Progress poll failed: {}", e);
                return PollOutcome::Failed;
            }
        };

        if !result.ok {
            debug!("Progress poll returned status {}", result.status);
            return PollOutcome::Failed;
        }

        match serde_json::from_str::<ProgressSnapshot>(&result.body) {
            Ok(snapshot) => PollOutcome::Snapshot(snapshot),
            Err(e) => {
                debug!("Unreadable progress body '{}': {}", result.body, e);
                PollOutcome::Failed
            }
        }
    }
}
