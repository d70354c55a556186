//! Execution lifecycle against the remote server.
//!
//! A run moves through four server-side steps, each owned by one component:
//!
//! ```text
//!   ExecutionTarget
//!         │
//!         │ HandleAcquirer::acquire()    POST load        (restart + retry once)
//!         ▼
//!   ExecutionToken
//!         │
//!         │ RunConfigurator::configure() POST params?token=
//!         │ RunStarter::start()          GET  play?token=
//!         ▼
//!   ProgressMonitor::run()               GET  progress?token=  (every 5 s)
//!         │                                    │
//!         │                                    └─► SnapshotWriter at thresholds
//!         ▼
//!   MonitorState::Stopped | MonitorState::Abandoned
//! ```
//!
//! # Error Handling
//!
//! Fatal failures are [`ExecutorError`]s and abort the run. Poll failures and
//! snapshot failures are absorbed by the monitor.

pub mod acquire;
pub mod configure;
pub mod monitor;
pub mod start;

use std::fmt;

use crate::client::TransportError;

pub use acquire::HandleAcquirer;
pub use configure::{RunConfigurator, RunParameters};
pub use monitor::{
    MonitorSettings, MonitorState, PollOutcome, ProgressMonitor, ProgressSnapshot,
    ProgressTracker, RunStatus, Step,
};
pub use start::RunStarter;

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Fatal failures of the execution lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// No token could be obtained, even after restarting the server.
    ///
    /// Almost always a wrong server URL or a wrong script locator.
    #[error(
        "[{url}] is an invalid URL or the provided script or file path '{locator}' is wrong. \
         Provide the URL of the TestingWhiz automation server in the format http://host:port/ \
         or check the provided script or file path"
    )]
    Acquisition { url: String, locator: String },

    /// The server refused the run parameters.
    #[error("Server rejected the run parameters")]
    ConfigurationRejected,

    /// The server refused to start the run.
    #[error("Server responded with status {status} when starting the run")]
    ExecutionStart { status: u16 },

    /// The server could not be reached for a non-retried call.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Opaque run identifier issued by the execution server.
///
/// Acquired once per run and required by every later call of that run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionToken(String);

impl ExecutionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
