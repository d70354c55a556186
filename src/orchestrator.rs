//! Run orchestration.
//!
//! The [`Orchestrator`] sequences one complete run against the execution
//! server:
//!
//! 1. **Report directory**: name and provision the run directory
//! 2. **Health check**: make sure the server answers
//! 3. **Acquisition**: exchange the target for a token
//! 4. **Configuration**: push the run parameters
//! 5. **Start**: trigger execution
//! 6. **Monitoring**: poll until `stop` or until the server is unreachable
//! 7. **Final report**: wait the settle interval and take a last snapshot
//! 8. **Release**: dispose the token's server-side resources
//!
//! Steps 4 to 7 may fail; step 8 still runs whenever a token was acquired.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use twrun::client::HttpTransport;
//! use twrun::clock::TokioClock;
//! use twrun::config::load_config;
//! use twrun::orchestrator::Orchestrator;
//! use twrun::report::{ConsoleReporter, FsReportSink};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config(std::path::Path::new("twrun.toml"))?;
//!
//!     let orchestrator = Orchestrator::new(
//!         config,
//!         Arc::new(HttpTransport::new()?),
//!         Arc::new(TokioClock),
//!         Arc::new(FsReportSink),
//!         Arc::new(ConsoleReporter::new()),
//!     );
//!
//!     let outcome = orchestrator.run().await?;
//!     println!("Run ended: {:?}", outcome.monitor);
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::{RemoteClient, ServerEndpoint, Transport};
use crate::clock::Clock;
use crate::config::Config;
use crate::executor::{
    ExecutionToken, ExecutorError, HandleAcquirer, MonitorSettings, MonitorState,
    ProgressMonitor, RunConfigurator, RunParameters, RunStarter,
};
use crate::report::{ReportError, ReportLayout, ReportSink, Reporter, SnapshotWriter};
use crate::server::ServerController;

/// Unrecovered failure of a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Report(#[from] ReportError),

    /// The health check failed before anything was submitted.
    #[error("Server is down: {0} did not answer")]
    ServerDown(String),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// How a run ended.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub token: ExecutionToken,

    /// Terminal monitor state. Both `Stopped` and `Abandoned` are successes.
    pub monitor: MonitorState,

    /// Whether the server acknowledged releasing the token's resources.
    pub disposed: bool,

    pub report_dir: PathBuf,
}

/// Drives one run from report setup to resource release.
pub struct Orchestrator {
    config: Config,
    client: RemoteClient,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ReportSink>,
    reporter: Arc<dyn Reporter>,
    layout: ReportLayout,
}

impl Orchestrator {
    /// Creates an orchestrator whose run directory is named from the current time.
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ReportSink>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let endpoint = ServerEndpoint::new(&config.server.url, config.server.base_url.as_deref());
        let layout = ReportLayout::now(&config.report, None);

        Self {
            config,
            client: RemoteClient::new(endpoint, transport),
            clock,
            sink,
            reporter,
            layout,
        }
    }

    /// Replaces the computed run directory.
    pub fn with_layout(mut self, layout: ReportLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    /// Runs the full lifecycle.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] for report setup failures, an unreachable
    /// server, failed acquisition, rejected parameters, or a refused start.
    /// Poll and snapshot failures are absorbed.
    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        self.layout
            .provision(
                self.sink.as_ref(),
                self.clock.as_ref(),
                self.config.timing.template_settle(),
            )
            .await?;

        let server = ServerController::new(self.client.clone());
        let url = self.client.endpoint().url().to_string();
        debug!("Server URL: {}", url);
        if !server.check_server().await {
            return Err(RunError::ServerDown(url));
        }
        debug!("Server is up");

        let token = HandleAcquirer::new(
            self.client.clone(),
            server.clone(),
            self.clock.clone(),
            self.config.timing.restart_cooldown(),
        )
        .acquire(&self.config.target)
        .await?;
        info!("Token received: {}", token);

        let result = self.execute(&token).await;

        let disposed = server.dispose(&token).await;
        debug!("Memory disposed for token {}: {}", token, disposed);

        let monitor = result?;
        Ok(RunOutcome {
            token,
            monitor,
            disposed,
            report_dir: self.layout.run_dir().to_path_buf(),
        })
    }

    /// Configuration through the final snapshot, for an acquired token.
    async fn execute(&self, token: &ExecutionToken) -> Result<MonitorState, RunError> {
        let params = RunParameters::from_config(
            &self.config,
            self.client.endpoint().base_url(),
            self.layout.run_dir(),
        );
        let accepted = RunConfigurator::new(self.client.clone())
            .configure(token, &params)
            .await
            .map_err(ExecutorError::from)?;
        if !accepted {
            return Err(ExecutorError::ConfigurationRejected.into());
        }

        RunStarter::new(self.client.clone()).start(token).await?;
        self.reporter.on_run_start(&self.config.target).await;

        let snapshots = SnapshotWriter::new(
            self.client.clone(),
            self.sink.clone(),
            self.layout.results_path(),
        );
        let monitor = ProgressMonitor::new(
            self.client.clone(),
            self.clock.clone(),
            snapshots.clone(),
            self.reporter.clone(),
            MonitorSettings::from_config(&self.config),
        );
        let state = monitor.run(token).await;
        self.reporter.on_run_complete(state).await;

        self.clock.sleep(self.config.report.settle_interval()).await;
        if !snapshots.write(token).await {
            warn!("Final report snapshot was not written");
        }

        Ok(state)
    }
}
