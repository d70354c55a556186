//! Starting a configured run.

use tracing::info;

use super::{ExecutionToken, ExecutorError, ExecutorResult};
use crate::client::{RemoteClient, with_token};

const PLAY_ROUTE: &str = "play";

/// Triggers execution for a configured token.
pub struct RunStarter {
    client: RemoteClient,
}

impl RunStarter {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    /// Starts the run; a non-2xx answer is [`ExecutorError::ExecutionStart`].
    pub async fn start(&self, token: &ExecutionToken) -> ExecutorResult<bool> {
        let result = self
            .client
            .get(&with_token(PLAY_ROUTE, token.as_str()))
            .await?;

        if !result.ok {
            return Err(ExecutorError::ExecutionStart {
                status: result.status,
            });
        }

        info!("Execution started for token {}", token);
        Ok(true)
    }
}
