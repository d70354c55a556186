//! Configuration loading, schema definitions and validation for twrun.
//!
//! Configuration is read from a TOML file. The schema covers the execution
//! server location, the target to run, execution and risk-based-testing
//! parameters, report output, and the timing of the run lifecycle.
//!
//! See `README.md` for the file format.

pub mod schema;

pub use schema::*;

use std::path::Path;

use anyhow::{Context, Result, bail};

/// Loads twrun configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read (e.g., doesn't exist or permission denied)
/// - The file contains invalid TOML syntax
/// - The configuration doesn't match the expected schema
///
/// # Example
///
/// ```no_run
/// use twrun::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("twrun.toml"))?;
/// println!("Server: {}", config.server.url);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Loads twrun configuration from a TOML string.
///
/// # Example
///
/// ```
/// use twrun::config::load_config_str;
///
/// let config = load_config_str(r#"
///     [server]
///     url = "http://localhost:8888"
///
///     [target]
///     type = "file_path"
///     file_path = "C:/scripts/login.twizx"
///
///     [report]
///     root = "reports"
/// "#)?;
///
/// assert_eq!(config.report.frequency, 10);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;

    Ok(config)
}

impl Config {
    /// Checks the semantic constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let url = self.server.url.trim();
        if url.is_empty() {
            bail!("server.url must not be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!(
                "server.url must be in the format http://host:port/ (got '{}')",
                url
            );
        }

        if self.report.frequency == 0 {
            bail!("report.frequency must be greater than 0");
        }

        if self.timing.max_poll_failures == 0 {
            bail!("timing.max_poll_failures must be greater than 0");
        }

        self.target.validate()
    }
}

impl ExecutionTarget {
    fn validate(&self) -> Result<()> {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|s| !s.trim().is_empty());

        match self.kind {
            TargetKind::FilePath if !present(&self.file_path) => {
                bail!("target.file_path is required for target type 'file_path'")
            }
            TargetKind::FolderPath if !present(&self.folder_path) => {
                bail!("target.folder_path is required for target type 'folder_path'")
            }
            TargetKind::TestCase if !present(&self.file_path) => {
                bail!("target.file_path is required for target type 'test_case'")
            }
            TargetKind::TestCase if !present(&self.test_case) => {
                bail!("target.test_case is required for target type 'test_case'")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [server]
        url = "http://localhost:8888"

        [target]
        file_path = "scripts/login.twizx"

        [report]
        root = "reports"
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = load_config_str(MINIMAL).unwrap();

        assert_eq!(config.target.kind, TargetKind::FilePath);
        assert_eq!(config.execution.browser, "Google Chrome");
        assert_eq!(config.execution.step_interval, None);
        assert_eq!(config.report.frequency, 10);
        assert_eq!(config.report.template_dir, std::path::PathBuf::from("ReportTemplate"));
        assert_eq!(config.timing.poll_interval_ms, 5000);
        assert_eq!(config.timing.retry_interval_ms, 2000);
        assert_eq!(config.timing.max_poll_failures, 5);
        assert_eq!(config.timing.restart_cooldown_secs, 180);
        assert!(!config.rbt.enabled());
        config.validate().unwrap();
    }

    #[test]
    fn test_full_config() {
        let config = load_config_str(
            r#"
            [server]
            url = "https://tw.example.com:8443/"
            base_url = "https://app.example.com"

            [target]
            type = "test_case"
            file_path = "suite.twizx"
            test_case = "Login_Valid"

            [execution]
            browser = "Firefox"
            step_interval = 3
            capture_failure_screenshot = true
            auto_healing = true

            [rbt]
            priority_medium = true
            label_execution = true
            labels = "smoke,regression"

            [report]
            root = "out"
            prefix = "nightly"
            frequency = 25
            settle_interval_ms = 1000

            [timing]
            poll_interval_ms = 100
        "#,
        )
        .unwrap();

        assert_eq!(config.target.kind, TargetKind::TestCase);
        assert_eq!(config.execution.step_interval, Some(3));
        assert!(config.rbt.enabled());
        assert_eq!(config.report.prefix.as_deref(), Some("nightly"));
        assert_eq!(config.timing.poll_interval_ms, 100);
        assert_eq!(config.timing.retry_interval_ms, 2000);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_url() {
        let mut config = load_config_str(MINIMAL).unwrap();
        config.server.url = "localhost:8888".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http://host:port/"));
    }

    #[test]
    fn test_rejects_zero_frequency() {
        let mut config = load_config_str(MINIMAL).unwrap();
        config.report.frequency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_missing_active_locator() {
        let mut config = load_config_str(MINIMAL).unwrap();
        config.target.kind = TargetKind::FolderPath;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("folder_path"));

        config.target.kind = TargetKind::TestCase;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("test_case"));
    }

    #[test]
    fn test_rejects_negative_step_interval() {
        let result = load_config_str(
            r#"
            [server]
            url = "http://localhost:8888"
            [target]
            file_path = "a.twizx"
            [execution]
            step_interval = -1
            [report]
            root = "reports"
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_server_section_fails_to_parse() {
        assert!(load_config_str("[report]\nroot = \"r\"").is_err());
    }
}
