//! Best-effort report snapshots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::sink::ReportSink;
use crate::client::{RemoteClient, with_token};
use crate::executor::ExecutionToken;

const REPORT_ROUTE: &str = "report_interim";

/// Identifier the report template reads the results from.
pub const RESULTS_IDENTIFIER: &str = "results";

/// Fetches the run's report payload and writes it into the run directory.
///
/// Snapshots never fail a run: a rejected fetch is skipped silently and a
/// transport or write failure is only logged.
#[derive(Clone)]
pub struct SnapshotWriter {
    client: RemoteClient,
    sink: Arc<dyn ReportSink>,
    results_path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(client: RemoteClient, sink: Arc<dyn ReportSink>, results_path: PathBuf) -> Self {
        Self {
            client,
            sink,
            results_path,
        }
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Returns true if a snapshot was written.
    pub async fn write(&self, token: &ExecutionToken) -> bool {
        let result = match self
            .client
            .get(&with_token(REPORT_ROUTE, token.as_str()))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Failed to fetch report for token {}: {}", token, e);
                return false;
            }
        };

        if !result.ok {
            debug!("Report not available (status {})", result.status);
            return false;
        }

        match self
            .sink
            .write_artifact(&self.results_path, RESULTS_IDENTIFIER, &result.body)
        {
            Ok(()) => {
                debug!("Wrote report snapshot to {}", self.results_path.display());
                true
            }
            Err(e) => {
                error!(
                    "Error writing report file {}: {}",
                    self.results_path.display(),
                    e
                );
                false
            }
        }
    }
}
