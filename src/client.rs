//! Remote endpoint client for the execution server.
//!
//! All traffic to the execution server goes through [`RemoteClient`], which
//! joins relative routes onto a normalized [`ServerEndpoint`] and hands the
//! request to a pluggable [`Transport`].
//!
//! # Error Model
//!
//! HTTP error statuses are data, not errors: a 4xx/5xx response comes back
//! as a [`CallResult`] with `ok == false`. Only connection-level failures
//! (DNS, refused connection, timeout) surface as [`TransportError`].
//!
//! ```text
//!   ServerController ─┐
//!   HandleAcquirer  ──┤
//!   RunConfigurator ──┼──► RemoteClient::call(route, method, body)
//!   RunStarter      ──┤            │
//!   ProgressMonitor ──┤            ▼
//!   SnapshotWriter  ──┘     Transport::send(Request)
//!                                  │
//!                                  ▼
//!                     HttpTransport (reqwest) / ScriptedTransport
//! ```

pub mod http;
pub mod scripted;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

pub use http::HttpTransport;
pub use scripted::{Reply, ScriptedTransport};

/// Connection-level failure talking to the execution server.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached at all.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// HTTP method used by the execution server routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

/// Raw status and body returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// Sends a request and returns its status and body.
///
/// Implementations must not turn HTTP error statuses into errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// Normalized result of a call to the execution server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    /// True for a 2xx status.
    pub ok: bool,
    pub status: u16,
    pub body: String,
}

impl From<Response> for CallResult {
    fn from(response: Response) -> Self {
        Self {
            ok: (200..300).contains(&response.status),
            status: response.status,
            body: response.body,
        }
    }
}

/// The execution server location.
///
/// `url` always ends with exactly one `/`. The optional `base_url` is never
/// called; it is only forwarded to the server as a run parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    url: String,
    base_url: Option<String>,
}

impl ServerEndpoint {
    pub fn new(url: impl AsRef<str>, base_url: Option<&str>) -> Self {
        Self {
            url: normalize(url.as_ref()),
            base_url: base_url
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(normalize),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Joins a relative route onto the server URL with exactly one separator.
    pub fn join(&self, route: &str) -> String {
        format!("{}{}", self.url, route.trim_start_matches('/'))
    }
}

fn normalize(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

/// Issues requests against a [`ServerEndpoint`].
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Clone)]
pub struct RemoteClient {
    endpoint: ServerEndpoint,
    transport: Arc<dyn Transport>,
}

impl RemoteClient {
    pub fn new(endpoint: ServerEndpoint, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Sends `method` to `route` relative to the server URL.
    pub async fn call(
        &self,
        route: &str,
        method: Method,
        body: Option<String>,
    ) -> Result<CallResult, TransportError> {
        let request = Request {
            method,
            url: self.endpoint.join(route),
            body,
        };
        debug!("{} {}", request.method, request.url);

        let result = CallResult::from(self.transport.send(request).await?);
        debug!("{} -> {}", route, result.status);
        Ok(result)
    }

    pub async fn get(&self, route: &str) -> Result<CallResult, TransportError> {
        self.call(route, Method::Get, None).await
    }

    pub async fn post(&self, route: &str, body: String) -> Result<CallResult, TransportError> {
        self.call(route, Method::Post, Some(body)).await
    }
}

/// Builds `route?token=<token>`.
pub(crate) fn with_token(route: &str, token: &str) -> String {
    format!("{}?token={}", route, token)
}
