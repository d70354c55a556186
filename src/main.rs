//! twrun CLI - drive a TestingWhiz execution server through a test run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use twrun::client::HttpTransport;
use twrun::clock::TokioClock;
use twrun::config::{self, Config, TargetKind};
use twrun::orchestrator::Orchestrator;
use twrun::report::{ConsoleReporter, FsReportSink, ReportLayout};

#[derive(Parser)]
#[command(name = "twrun")]
#[command(about = "Run a test on a remote TestingWhiz execution server", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "twrun.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the configured target and collect its report
    Run {
        /// Override the execution server URL
        #[arg(long)]
        server_url: Option<String>,

        /// Override the report root directory
        #[arg(long)]
        report_root: Option<PathBuf>,

        /// Group this run under Report_<GROUP> inside the report root
        #[arg(long)]
        group: Option<String>,
    },

    /// Validate configuration file
    Validate,

    /// Initialize a new configuration file
    Init {
        /// Target type (file, folder, test-case)
        #[arg(short, long, default_value = "file")]
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            server_url,
            report_root,
            group,
        } => run(&cli.config, server_url, report_root, group).await,
        Commands::Validate => validate_config(&cli.config),
        Commands::Init { target } => init_config(&target),
    }
}

async fn run(
    config_path: &Path,
    server_url: Option<String>,
    report_root: Option<PathBuf>,
    group: Option<String>,
) -> Result<()> {
    let mut config = config::load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Apply overrides
    if let Some(url) = server_url {
        config.server.url = url;
    }
    if let Some(root) = report_root {
        config.report.root = root;
    }
    config.validate()?;

    info!("Loaded configuration from {}", config_path.display());

    let layout = ReportLayout::now(&config.report, group.as_deref());
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(HttpTransport::new()?),
        Arc::new(TokioClock),
        Arc::new(FsReportSink),
        Arc::new(ConsoleReporter::new()),
    )
    .with_layout(layout);

    match orchestrator.run().await {
        Ok(outcome) => {
            info!(
                "Run finished ({:?}), report at {}",
                outcome.monitor,
                outcome.report_dir.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", console::style(format!("Task failed: {}", e)).red().bold());
            std::process::exit(1);
        }
    }
}

fn validate_config(config_path: &Path) -> Result<()> {
    let config = match config::load_config(config_path).and_then(|c| c.validate().map(|()| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    println!("Configuration is valid!");
    println!();
    print_summary(&config);
    Ok(())
}

fn print_summary(config: &Config) {
    println!("Settings:");
    println!("  Server: {}", config.server.url);
    if let Some(base_url) = &config.server.base_url {
        println!("  Base URL: {}", base_url);
    }

    let target_type = match config.target.kind {
        TargetKind::FilePath => "file_path",
        TargetKind::FolderPath => "folder_path",
        TargetKind::TestCase => "test_case",
    };
    println!("  Target: {} ({})", config.target.load_reference(), target_type);
    if let Some(test_case) = config.target.test_object() {
        println!("  Test case: {}", test_case);
    }

    println!("  Browser: {}", config.execution.browser);
    println!("  Risk-based testing: {}", config.rbt.enabled());
    println!("  Report root: {}", config.report.root.display());
    println!("  Report frequency: {}%", config.report.frequency);
    println!("  Poll interval: {}ms", config.timing.poll_interval_ms);
}

fn init_config(target: &str) -> Result<()> {
    let target_config = match target {
        "file" => {
            r#"[target]
type = "file_path"
file_path = "C:/TestingWhiz/Scripts/Login.twizx""#
        }
        "folder" => {
            r#"[target]
type = "folder_path"
folder_path = "C:/TestingWhiz/Scripts/Regression""#
        }
        "test-case" => {
            r#"[target]
type = "test_case"
file_path = "C:/TestingWhiz/Scripts/Login.twizx"
test_case = "Login_ValidCredentials""#
        }
        _ => {
            eprintln!("Unknown target: {}. Use: file, folder, test-case", target);
            std::process::exit(1);
        }
    };

    let config = format!(
        r#"# twrun configuration file

[server]
url = "http://localhost:8888/"
# base_url = "https://app-under-test.example.com/"

{}

[execution]
browser = "Google Chrome"
step_interval = 0
capture_failure_screenshot = false
capture_condition_failure_screenshot = false
auto_healing = false

[rbt]
priority_high = false
priority_medium = false
priority_low = false
label_execution = false

[report]
root = "reports"
frequency = 10
settle_interval_ms = 5000
template_dir = "ReportTemplate"
"#,
        target_config
    );

    let path = PathBuf::from("twrun.toml");
    if path.exists() {
        eprintln!("twrun.toml already exists. Remove it first or edit manually.");
        std::process::exit(1);
    }

    std::fs::write(&path, config)?;
    println!("Created twrun.toml");
    println!();
    println!("Edit the configuration as needed, then run:");
    println!("  twrun run");

    Ok(())
}
