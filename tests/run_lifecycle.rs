//! End-to-end runs of the orchestrator against a scripted server.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use twrun::client::{Reply, ScriptedTransport};
use twrun::clock::RecordingClock;
use twrun::config::{Config, ExecutionTarget, load_config_str};
use twrun::executor::{ExecutorError, MonitorState};
use twrun::orchestrator::{Orchestrator, RunError};
use twrun::report::sink::parse_assignment;
use twrun::report::{FsReportSink, ReportLayout, Reporter};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Start,
    Progress(f64),
    Snapshot(f64),
    Complete(MonitorState),
}

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn on_run_start(&self, _target: &ExecutionTarget) {
        self.push(Event::Start);
    }

    async fn on_progress(&self, percent: f64) {
        self.push(Event::Progress(percent));
    }

    async fn on_snapshot(&self, percent: f64) {
        self.push(Event::Snapshot(percent));
    }

    async fn on_run_complete(&self, state: MonitorState) {
        self.push(Event::Complete(state));
    }
}

fn config(dir: &Path) -> Config {
    let template = dir.join("ReportTemplate");
    fs::create_dir_all(template.join("data")).unwrap();
    fs::write(template.join("index.html"), "<html></html>").unwrap();

    load_config_str(&format!(
        r#"
        [server]
        url = "http://tw.local:8888"

        [target]
        type = "file_path"
        file_path = "Scripts/Login.twizx"

        [report]
        root = "{root}"
        frequency = 10
        settle_interval_ms = 1000
        template_dir = "{template}"
        "#,
        root = dir.join("reports").display(),
        template = template.display(),
    ))
    .unwrap()
}

fn progress(status: &str, percent: u32) -> Reply {
    Reply::ok(format!(
        r#"{{"status":"{}","time":0,"progress":{}}}"#,
        status, percent
    ))
}

struct Harness {
    transport: Arc<ScriptedTransport>,
    clock: Arc<RecordingClock>,
    reporter: Arc<RecordingReporter>,
    orchestrator: Orchestrator,
}

fn harness(dir: &Path, transport: ScriptedTransport) -> Harness {
    let config = config(dir);
    let layout = ReportLayout::new(&config.report, "01012026_093000", None);
    let transport = Arc::new(transport);
    let clock = Arc::new(RecordingClock::new());
    let reporter = Arc::new(RecordingReporter::default());

    let orchestrator = Orchestrator::new(
        config,
        transport.clone(),
        clock.clone(),
        Arc::new(FsReportSink),
        reporter.clone(),
    )
    .with_layout(layout);

    Harness {
        transport,
        clock,
        reporter,
        orchestrator,
    }
}

fn healthy_server() -> ScriptedTransport {
    ScriptedTransport::new()
        .on("", [Reply::ok("TestingWhiz")])
        .on("load", [Reply::ok("tok-1")])
        .on("params", [Reply::ok("")])
        .on("play", [Reply::ok("")])
        .on("despose", [Reply::ok("")])
}

#[tokio::test]
async fn test_threshold_scenario_to_stop() {
    let dir = tempfile::tempdir().unwrap();
    let transport = healthy_server()
        .on(
            "progress",
            [
                progress("play", 5),
                progress("play", 12),
                progress("play", 12),
                progress("play", 25),
                progress("play", 100),
                progress("stop", 100),
            ],
        )
        .on(
            "report_interim",
            [Reply::ok("[12]"), Reply::ok("[25]"), Reply::ok("[100]")],
        );
    let h = harness(dir.path(), transport);

    let outcome = h.orchestrator.run().await.unwrap();

    assert_eq!(outcome.monitor, MonitorState::Stopped);
    assert_eq!(outcome.token.as_str(), "tok-1");
    assert!(outcome.disposed);

    assert_eq!(
        h.reporter.events(),
        vec![
            Event::Start,
            Event::Progress(5.0),
            Event::Progress(12.0),
            Event::Snapshot(12.0),
            Event::Progress(25.0),
            Event::Snapshot(25.0),
            Event::Progress(100.0),
            Event::Complete(MonitorState::Stopped),
        ]
    );

    // Two threshold snapshots plus the final one; no polls after stop.
    assert_eq!(h.transport.count("report_interim"), 3);
    assert_eq!(h.transport.count("progress"), 6);
    assert_eq!(h.transport.count("despose"), 1);

    let results = fs::read_to_string(outcome.report_dir.join("data").join("results.js")).unwrap();
    assert_eq!(parse_assignment(&results, "results"), Some("[100]"));
    assert!(outcome.report_dir.join("index.html").is_file());

    let mut expected = vec![Duration::from_secs(2)];
    expected.extend([Duration::from_secs(5); 5]);
    expected.push(Duration::from_secs(1));
    assert_eq!(h.clock.sleeps(), expected);
}

#[tokio::test]
async fn test_unreachable_progress_abandons_and_takes_final_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let transport = healthy_server()
        .on("progress", [Reply::status(502, "bad gateway")])
        .on("report_interim", [Reply::ok("{}")]);
    let h = harness(dir.path(), transport);

    let outcome = h.orchestrator.run().await.unwrap();

    assert_eq!(outcome.monitor, MonitorState::Abandoned);
    assert_eq!(h.transport.count("progress"), 5);
    assert_eq!(h.transport.count("report_interim"), 1);
    assert_eq!(h.transport.count("despose"), 1);
    assert_eq!(
        h.reporter.events(),
        vec![Event::Start, Event::Complete(MonitorState::Abandoned)]
    );

    let retries: Vec<_> = h
        .clock
        .sleeps()
        .into_iter()
        .filter(|d| *d == Duration::from_secs(2))
        .collect();
    // Template settle plus four retry waits.
    assert_eq!(retries.len(), 5);
}

#[tokio::test]
async fn test_params_carry_report_dir() {
    let dir = tempfile::tempdir().unwrap();
    let transport = healthy_server().on("progress", [progress("stop", 100)]);
    let h = harness(dir.path(), transport);

    let outcome = h.orchestrator.run().await.unwrap();

    let params = h
        .transport
        .requests()
        .into_iter()
        .find(|r| r.url.contains("/params?token=tok-1"))
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(params.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["reportPath"], outcome.report_dir.to_string_lossy().to_string());
    assert_eq!(body["browser"], "Google Chrome");
}

#[tokio::test]
async fn test_server_down_after_report_dir_created() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new().on("", [Reply::transport_failure("refused")]);
    let h = harness(dir.path(), transport);

    let err = h.orchestrator.run().await.unwrap_err();

    assert!(matches!(err, RunError::ServerDown(_)));
    assert!(h.orchestrator.layout().run_dir().is_dir());
    assert_eq!(h.transport.count("load"), 0);
}

#[tokio::test]
async fn test_acquisition_failure_skips_dispose() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new()
        .on("", [Reply::ok("")])
        .on("load", [Reply::status(500, "")])
        .on("restart-tw", [Reply::ok("")]);
    let h = harness(dir.path(), transport);

    let err = h.orchestrator.run().await.unwrap_err();

    assert!(matches!(
        err,
        RunError::Executor(ExecutorError::Acquisition { .. })
    ));
    assert_eq!(h.transport.count("load"), 2);
    assert_eq!(h.transport.count("despose"), 0);
    assert!(h.clock.sleeps().contains(&Duration::from_secs(180)));
}

#[tokio::test]
async fn test_rejected_configuration_still_disposes() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new()
        .on("", [Reply::ok("")])
        .on("load", [Reply::ok("tok-9")])
        .on("params", [Reply::status(400, "bad params")])
        .on("despose", [Reply::ok("")]);
    let h = harness(dir.path(), transport);

    let err = h.orchestrator.run().await.unwrap_err();

    assert!(matches!(
        err,
        RunError::Executor(ExecutorError::ConfigurationRejected)
    ));
    assert_eq!(h.transport.count("play"), 0);
    assert_eq!(h.transport.count("despose"), 1);
}

#[tokio::test]
async fn test_refused_start_still_disposes() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new()
        .on("", [Reply::ok("")])
        .on("load", [Reply::ok("tok-9")])
        .on("params", [Reply::ok("")])
        .on("play", [Reply::status(503, "")])
        .on("despose", [Reply::status(500, "")]);
    let h = harness(dir.path(), transport);

    let err = h.orchestrator.run().await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Server responded with status 503 when starting the run"
    );
    assert_eq!(h.transport.count("progress"), 0);
    assert_eq!(h.transport.count("despose"), 1);
}

#[tokio::test]
async fn test_failed_dispose_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new()
        .on("", [Reply::ok("")])
        .on("load", [Reply::ok("tok-1")])
        .on("params", [Reply::ok("")])
        .on("play", [Reply::ok("")])
        .on("progress", [progress("stop", 100)])
        .on("despose", [Reply::status(500, "")]);
    let h = harness(dir.path(), transport);

    let outcome = h.orchestrator.run().await.unwrap();

    assert_eq!(outcome.monitor, MonitorState::Stopped);
    assert!(!outcome.disposed);
}
