//! Run reporting: operator notifications and report artifacts.
//!
//! Two concerns live here:
//!
//! - [`Reporter`] receives lifecycle events (run start, progress, snapshot
//!   triggers, completion) and presents them to the operator.
//! - The submodules produce the on-disk report: [`layout`] computes and
//!   provisions the run directory, [`snapshot`] fetches the report payload
//!   from the server, and [`sink`] writes it.

pub mod layout;
pub mod sink;
pub mod snapshot;

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::ExecutionTarget;
use crate::executor::MonitorState;

pub use layout::{Provision, ReportLayout};
pub use sink::{FsReportSink, ReportSink};
pub use snapshot::SnapshotWriter;

/// Result type for report directory operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Failures preparing the report directory. Always fatal, always pre-run.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The template is gone but a run directory with this name already exists.
    #[error(
        "Report template not found at {} while run directory {} already exists",
        template.display(),
        run_dir.display()
    )]
    TemplateMissing { template: PathBuf, run_dir: PathBuf },

    /// Copying the template failed.
    #[error(
        "Failed to copy report template {} to {}: {source}",
        template.display(),
        run_dir.display()
    )]
    Copy {
        template: PathBuf,
        run_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Receives run lifecycle events.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Called once the run has been started on the server.
    async fn on_run_start(&self, target: &ExecutionTarget);

    /// Called when the completion percentage advances.
    async fn on_progress(&self, percent: f64);

    /// Called when a progress threshold triggers an interim snapshot.
    async fn on_snapshot(&self, percent: f64);

    /// Called when monitoring reaches a terminal state.
    async fn on_run_complete(&self, state: MonitorState);
}

/// A reporter that does nothing.
pub struct NullReporter;

#[async_trait]
impl Reporter for NullReporter {
    async fn on_run_start(&self, _target: &ExecutionTarget) {}
    async fn on_progress(&self, _percent: f64) {}
    async fn on_snapshot(&self, _percent: f64) {}
    async fn on_run_complete(&self, _state: MonitorState) {}
}

/// Console reporter with a percentage bar.
pub struct ConsoleReporter {
    progress: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(None),
        }
    }

    fn println(&self, line: String) {
        let guard = self.progress.lock().ok();
        match guard.as_deref().and_then(Option::as_ref) {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Reporter for ConsoleReporter {
    async fn on_run_start(&self, target: &ExecutionTarget) {
        println!(" Executing Script File : {}", target.load_reference());
        if let Some(test_case) = target.test_object() {
            println!(" Test Case : {}", test_case);
        }
        println!();
        println!(
            "{}",
            console::style(
                " ========================== Script Execution Start ==========================="
            )
            .bold()
        );
        println!();
        println!(" Script  0 %  completed");

        let pb = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }

        if let Ok(mut progress) = self.progress.lock() {
            *progress = Some(pb);
        }
    }

    async fn on_progress(&self, percent: f64) {
        {
            let guard = self.progress.lock().ok();
            if let Some(pb) = guard.as_deref().and_then(Option::as_ref) {
                pb.set_position(percent.clamp(0.0, 100.0) as u64);
            }
        }
        self.println(format!(" Script {}% completed", percent));
    }

    async fn on_snapshot(&self, percent: f64) {
        self.println(format!(
            " {}",
            console::style(format!("Triggered report for {}% completion", percent)).cyan()
        ));
    }

    async fn on_run_complete(&self, state: MonitorState) {
        if let Some(pb) = self.progress.lock().ok().and_then(|mut p| p.take()) {
            pb.finish_and_clear();
        }

        match state {
            MonitorState::Abandoned => println!(
                " {}",
                console::style("Lost contact with the execution server").red().bold()
            ),
            _ => println!(" Script  100 %  completed"),
        }
        println!();
        println!(
            "{}",
            console::style(
                " ========================== Script Execution End ==========================="
            )
            .bold()
        );
        println!();
    }
}
