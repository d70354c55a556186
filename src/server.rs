//! Health and lifecycle control of the execution server.

use tracing::{debug, warn};

use crate::client::{RemoteClient, with_token};
use crate::executor::ExecutionToken;

const HEALTH_ROUTE: &str = "/";
const RESTART_ROUTE: &str = "restart-tw";
const DISPOSE_ROUTE: &str = "despose";

/// Checks, restarts and releases resources on the execution server.
///
/// None of these operations fail: a transport error is reported as a
/// negative answer and logged.
#[derive(Clone)]
pub struct ServerController {
    client: RemoteClient,
}

impl ServerController {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    /// Returns true if the server root answers with a 2xx status.
    pub async fn check_server(&self) -> bool {
        match self.client.get(HEALTH_ROUTE).await {
            Ok(result) => result.ok,
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Asks the server to restart itself.
    ///
    /// Only reports whether the request was acknowledged; the caller is
    /// responsible for waiting until the server is back.
    pub async fn restart(&self) -> bool {
        match self.client.get(RESTART_ROUTE).await {
            Ok(result) => {
                if !result.ok {
                    warn!("Server refused restart with status {}", result.status);
                }
                result.ok
            }
            Err(e) => {
                warn!("Restart request failed: {}", e);
                false
            }
        }
    }

    /// Releases server-side memory held for `token`.
    pub async fn dispose(&self, token: &ExecutionToken) -> bool {
        match self
            .client
            .get(&with_token(DISPOSE_ROUTE, token.as_str()))
            .await
        {
            Ok(result) => result.ok,
            Err(e) => {
                warn!("Dispose request for token {} failed: {}", token, e);
                false
            }
        }
    }
}
