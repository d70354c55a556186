//! twrun: drive a remote TestingWhiz execution server through a test run.
//!
//! twrun submits a test artifact to an execution server, configures and
//! starts the run, polls its progress, writes interim report snapshots at
//! configurable progress thresholds, and produces a final report.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **Clock**: Cooperative delays, replaceable for deterministic tests
//! - **Client**: Requests against the server over a pluggable transport
//! - **Server**: Health check, restart and resource release
//! - **Executor**: Token acquisition, configuration, start, progress monitor
//! - **Report**: Run directory setup, snapshots, operator notifications
//! - **Orchestrator**: Sequences a complete run
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use twrun::config::load_config;
//! use twrun::{ConsoleReporter, FsReportSink, HttpTransport, Orchestrator, TokioClock};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config(std::path::Path::new("twrun.toml"))?;
//!     config.validate()?;
//!
//!     let orchestrator = Orchestrator::new(
//!         config,
//!         Arc::new(HttpTransport::new()?),
//!         Arc::new(TokioClock),
//!         Arc::new(FsReportSink),
//!         Arc::new(ConsoleReporter::new()),
//!     );
//!     orchestrator.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod executor;
pub mod orchestrator;
pub mod report;
pub mod server;

// Re-export commonly used types
pub use client::{HttpTransport, RemoteClient, ServerEndpoint, Transport};
pub use clock::{Clock, TokioClock};
pub use config::{Config, load_config};
pub use executor::{ExecutionToken, ExecutorError, MonitorState};
pub use orchestrator::{Orchestrator, RunError, RunOutcome};
pub use report::{ConsoleReporter, FsReportSink, Reporter};
