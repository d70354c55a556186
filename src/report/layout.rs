//! Run directory naming and provisioning.
//!
//! Every run writes into its own directory, named once from the wall clock
//! before any server call is made:
//!
//! ```text
//! <root>/[<prefix>/Report_<group>/][<prefix>/]Report_<ddMMyyyy_hhmmss>
//! ```
//!
//! The hour is on a 12-hour clock. Provisioning copies the report template
//! into that directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, info, warn};

use super::sink::ReportSink;
use super::{ReportError, ReportResult};
use crate::clock::Clock;
use crate::config::ReportConfig;

const RESULTS_DIR: &str = "data";
const RESULTS_FILE: &str = "results.js";

/// Formats `now` as `ddMMyyyy_hhmmss` with a 12-hour clock.
pub fn timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%d%m%Y_%I%M%S").to_string()
}

/// What [`ReportLayout::provision`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provision {
    /// The template was copied into the run directory.
    Copied,
    /// The run directory was already in place; nothing was touched.
    AlreadyProvisioned,
}

/// The run directory of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    template_dir: PathBuf,
    run_dir: PathBuf,
}

impl ReportLayout {
    /// Computes the run directory for a run named `stamp`.
    pub fn new(config: &ReportConfig, stamp: &str, group: Option<&str>) -> Self {
        let prefix = config.prefix.as_deref().filter(|p| !p.is_empty());

        let mut run_dir = config.root.clone();
        if let Some(group) = group {
            if let Some(prefix) = prefix {
                run_dir.push(prefix);
            }
            run_dir.push(format!("Report_{}", group));
        }
        if let Some(prefix) = prefix {
            run_dir.push(prefix);
        }
        run_dir.push(format!("Report_{}", stamp));

        Self {
            template_dir: config.template_dir.clone(),
            run_dir,
        }
    }

    /// Computes the run directory from the local wall clock.
    pub fn now(config: &ReportConfig, group: Option<&str>) -> Self {
        Self::new(config, &timestamp(&Local::now()), group)
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Where report snapshots are written.
    pub fn results_path(&self) -> PathBuf {
        self.run_dir.join(RESULTS_DIR).join(RESULTS_FILE)
    }

    /// Makes sure the run directory exists and holds the template.
    ///
    /// | template | run dir | result |
    /// |----------|---------|--------|
    /// | present  | missing | copy, then wait `settle` |
    /// | missing  | missing | create empty run dir, then wait `settle` |
    /// | present  | present | nothing (already provisioned) |
    /// | missing  | present | [`ReportError::TemplateMissing`] |
    pub async fn provision(
        &self,
        sink: &dyn ReportSink,
        clock: &dyn Clock,
        settle: Duration,
    ) -> ReportResult<Provision> {
        let template_present = sink.exists(&self.template_dir);
        let run_dir_present = sink.exists(&self.run_dir);

        match (template_present, run_dir_present) {
            (true, true) => {
                debug!("Run directory {} already provisioned", self.run_dir.display());
                return Ok(Provision::AlreadyProvisioned);
            }
            (false, true) => {
                return Err(ReportError::TemplateMissing {
                    template: self.template_dir.clone(),
                    run_dir: self.run_dir.clone(),
                });
            }
            (false, false) => warn!(
                "Report template {} not found, creating an empty run directory",
                self.template_dir.display()
            ),
            (true, false) => {}
        }

        sink.copy_tree(&self.template_dir, &self.run_dir)
            .map_err(|source| ReportError::Copy {
                template: self.template_dir.clone(),
                run_dir: self.run_dir.clone(),
                source,
            })?;
        info!("Report directory: {}", self.run_dir.display());

        clock.sleep(settle).await;
        Ok(Provision::Copied)
    }
}
