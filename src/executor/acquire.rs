//! Token acquisition with a single restart-and-retry cycle.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{ExecutionToken, ExecutorError, ExecutorResult};
use crate::client::RemoteClient;
use crate::clock::Clock;
use crate::config::ExecutionTarget;
use crate::server::ServerController;

const LOAD_ROUTE: &str = "load";
const FILE_TYPE: &str = "twizx";

/// Restart cycles allowed before acquisition is considered a configuration error.
const MAX_RESTARTS: usize = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadRequest<'a> {
    file_name: &'a str,
    file_type: &'a str,
}

/// Exchanges an [`ExecutionTarget`] for an [`ExecutionToken`].
///
/// A failed load is usually a server that needs restarting, so the first
/// failure restarts the server, waits out the cooldown, and retries the full
/// request. Anything that survives one restart is reported as
/// [`ExecutorError::Acquisition`].
pub struct HandleAcquirer {
    client: RemoteClient,
    server: ServerController,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl HandleAcquirer {
    pub fn new(
        client: RemoteClient,
        server: ServerController,
        clock: Arc<dyn Clock>,
        cooldown: Duration,
    ) -> Self {
        Self {
            client,
            server,
            clock,
            cooldown,
        }
    }

    pub async fn acquire(&self, target: &ExecutionTarget) -> ExecutorResult<ExecutionToken> {
        for attempt in 0..=MAX_RESTARTS {
            let reason = match self.load(target).await {
                Ok(token) => {
                    debug!("Acquired token {} on attempt {}", token, attempt + 1);
                    return Ok(token);
                }
                Err(reason) => reason,
            };
            warn!("Failed to load '{}': {}", target.load_reference(), reason);

            if attempt == MAX_RESTARTS {
                break;
            }
            if !self.server.restart().await {
                warn!("Server did not acknowledge the restart request");
                break;
            }

            info!(
                "Server restarted, waiting {}s before retrying",
                self.cooldown.as_secs()
            );
            self.clock.sleep(self.cooldown).await;
        }

        Err(ExecutorError::Acquisition {
            url: self.client.endpoint().url().to_string(),
            locator: target.load_reference().to_string(),
        })
    }

    /// One load request. Any failure is returned as a description.
    async fn load(&self, target: &ExecutionTarget) -> Result<ExecutionToken, String> {
        let body = serde_json::to_string(&LoadRequest {
            file_name: target.load_reference(),
            file_type: FILE_TYPE,
        })
        .map_err(|e| e.to_string())?;

        let result = self
            .client
            .post(LOAD_ROUTE, body)
            .await
            .map_err(|e| e.to_string())?;

        if !result.ok {
            return Err(format!("status {} - {}", result.status, result.body.trim()));
        }

        let token = result.body.trim();
        if token.is_empty() {
            return Err("server returned an empty token".to_string());
        }
        Ok(ExecutionToken::new(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Reply, ScriptedTransport, ServerEndpoint};
    use crate::clock::RecordingClock;

    const COOLDOWN: Duration = Duration::from_secs(180);

    fn acquirer(
        transport: Arc<ScriptedTransport>,
        clock: Arc<RecordingClock>,
    ) -> HandleAcquirer {
        let client = RemoteClient::new(ServerEndpoint::new("http://tw:8888", None), transport);
        HandleAcquirer::new(
            client.clone(),
            ServerController::new(client),
            clock,
            COOLDOWN,
        )
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let transport = Arc::new(ScriptedTransport::new().on("load", [Reply::ok(" tok-1\n")]));
        let clock = Arc::new(RecordingClock::new());

        let token = acquirer(transport.clone(), clock.clone())
            .acquire(&ExecutionTarget::file("login.twizx"))
            .await
            .unwrap();

        assert_eq!(token.as_str(), "tok-1");
        assert_eq!(transport.count("restart-tw"), 0);
        assert!(clock.sleeps().is_empty());

        let body: serde_json::Value =
            serde_json::from_str(transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["fileName"], "login.twizx");
        assert_eq!(body["fileType"], "twizx");
    }

    #[tokio::test]
    async fn test_fails_once_then_succeeds_after_restart() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("load", [Reply::status(500, "not ready"), Reply::ok("tok-2")])
                .on("restart-tw", [Reply::ok("")]),
        );
        let clock = Arc::new(RecordingClock::new());

        let token = acquirer(transport.clone(), clock.clone())
            .acquire(&ExecutionTarget::file("login.twizx"))
            .await
            .unwrap();

        assert_eq!(token.as_str(), "tok-2");
        assert_eq!(transport.count("load"), 2);
        assert_eq!(transport.count("restart-tw"), 1);
        assert_eq!(clock.sleeps(), vec![COOLDOWN]);
    }

    #[tokio::test]
    async fn test_transport_failure_then_success() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("load", [Reply::transport_failure("refused"), Reply::ok("tok-3")])
                .on("restart-tw", [Reply::ok("")]),
        );
        let clock = Arc::new(RecordingClock::new());

        let token = acquirer(transport, clock)
            .acquire(&ExecutionTarget::file("login.twizx"))
            .await
            .unwrap();
        assert_eq!(token.as_str(), "tok-3");
    }

    #[tokio::test]
    async fn test_two_failures_are_terminal() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("load", [Reply::status(404, "no such file")])
                .on("restart-tw", [Reply::ok("")]),
        );
        let clock = Arc::new(RecordingClock::new());

        let err = acquirer(transport.clone(), clock.clone())
            .acquire(&ExecutionTarget::file("missing.twizx"))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::Acquisition { .. }));
        assert!(err.to_string().contains("missing.twizx"));
        assert_eq!(transport.count("load"), 2);
        assert_eq!(transport.count("restart-tw"), 1);
        assert_eq!(clock.sleeps(), vec![COOLDOWN]);
    }

    #[tokio::test]
    async fn test_restart_refused_is_terminal_without_cooldown() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("load", [Reply::status(500, "")])
                .on("restart-tw", [Reply::status(500, "")]),
        );
        let clock = Arc::new(RecordingClock::new());

        let err = acquirer(transport.clone(), clock.clone())
            .acquire(&ExecutionTarget::file("login.twizx"))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::Acquisition { .. }));
        assert_eq!(transport.count("load"), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_empty_token_counts_as_failure() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("load", [Reply::ok("   ")])
                .on("restart-tw", [Reply::ok("")]),
        );
        let clock = Arc::new(RecordingClock::new());

        let result = acquirer(transport.clone(), clock)
            .acquire(&ExecutionTarget::file("login.twizx"))
            .await;
        assert!(result.is_err());
        assert_eq!(transport.count("load"), 2);
    }
}
