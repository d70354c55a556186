//! Run parameters and the configuration call.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use super::ExecutionToken;
use crate::client::{RemoteClient, TransportError, with_token};
use crate::config::Config;

const PARAMS_ROUTE: &str = "params";
const OPERATING_SYSTEM: &str = "Windows";

/// Parameter payload accepted by the server's params route.
///
/// Field names follow the server contract exactly. Built once per run and
/// never changed after it has been submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunParameters {
    pub browser: String,

    /// Delay between steps.
    pub interval: u64,

    #[serde(rename = "operatingSystem")]
    pub operating_system: String,

    pub version: String,

    #[serde(rename = "isRBTEnable")]
    pub rbt_enabled: bool,

    #[serde(rename = "highPriority")]
    pub high_priority: bool,

    #[serde(rename = "mediumPriority")]
    pub medium_priority: bool,

    #[serde(rename = "lowPriority")]
    pub low_priority: bool,

    #[serde(rename = "isLabelBaseTestExecution")]
    pub label_execution: bool,

    #[serde(rename = "settingLabel", skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,

    #[serde(rename = "testObject", skip_serializing_if = "Option::is_none")]
    pub test_object: Option<String>,

    #[serde(rename = "isAutoHealingEnabled")]
    pub auto_healing: bool,

    #[serde(rename = "reportPath")]
    pub report_path: String,

    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(rename = "isFailureScreenshot")]
    pub failure_screenshot: bool,

    #[serde(rename = "isConditionFailureScreenshot")]
    pub condition_failure_screenshot: bool,
}

impl RunParameters {
    /// Builds the payload for a run whose reports go to `report_dir`.
    pub fn from_config(config: &Config, base_url: Option<&str>, report_dir: &Path) -> Self {
        let execution = &config.execution;
        let rbt = &config.rbt;

        Self {
            browser: execution.browser.clone(),
            interval: execution.step_interval.unwrap_or(0),
            operating_system: OPERATING_SYSTEM.to_string(),
            version: String::new(),
            rbt_enabled: rbt.enabled(),
            high_priority: rbt.priority_high,
            medium_priority: rbt.priority_medium,
            low_priority: rbt.priority_low,
            label_execution: rbt.label_execution,
            labels: rbt.labels.clone().filter(|l| !l.is_empty()),
            test_object: config.target.test_object().map(str::to_string),
            auto_healing: execution.auto_healing,
            report_path: report_dir.to_string_lossy().to_string(),
            base_url: base_url.map(str::to_string),
            failure_screenshot: execution.capture_failure_screenshot,
            condition_failure_screenshot: execution.capture_condition_failure_screenshot,
        }
    }
}

/// Pushes [`RunParameters`] for a token.
pub struct RunConfigurator {
    client: RemoteClient,
}

impl RunConfigurator {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    /// Returns whether the server accepted the parameters. Never retried.
    pub async fn configure(
        &self,
        token: &ExecutionToken,
        params: &RunParameters,
    ) -> Result<bool, TransportError> {
        let body = serde_json::to_string(params)
            .map_err(|e| TransportError::Body(format!("Failed to encode run parameters: {}", e)))?;
        debug!("Run parameters: {}", body);

        let result = self
            .client
            .post(&with_token(PARAMS_ROUTE, token.as_str()), body)
            .await?;

        if !result.ok {
            warn!(
                "Server rejected run parameters with status {}: {}",
                result.status,
                result.body.trim()
            );
        }
        Ok(result.ok)
    }
}
