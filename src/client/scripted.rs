//! In-memory transport that replays scripted replies.
//!
//! Routes are keyed by the last path segment of the request URL with the
//! query string removed, so `http://host/progress?token=abc` matches the
//! `"progress"` script and the health check on the server root matches `""`.
//! Each script is consumed front to back; its final reply repeats forever.
//! Unscripted routes answer 404.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Request, Response, Transport, TransportError};

/// A single canned reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(u16, String),
    TransportFailure(String),
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Status(200, body.into())
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Reply::Status(status, body.into())
    }

    pub fn transport_failure(message: impl Into<String>) -> Self {
        Reply::TransportFailure(message.into())
    }
}

/// Scripted [`Transport`] that records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends replies for `route`.
    pub fn on<I>(self, route: &str, replies: I) -> Self
    where
        I: IntoIterator<Item = Reply>,
    {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts
                .entry(route.to_string())
                .or_default()
                .extend(replies);
        }
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of requests received for `route`.
    pub fn count(&self, route: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| route_key(&r.url) == route)
            .count()
    }

    fn next_reply(&self, route: &str) -> Option<Reply> {
        let mut scripts = self.scripts.lock().ok()?;
        let queue = scripts.get_mut(route)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let route = route_key(&request.url).to_string();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        match self.next_reply(&route) {
            Some(Reply::Status(status, body)) => Ok(Response { status, body }),
            Some(Reply::TransportFailure(message)) => Err(TransportError::Connection(message)),
            None => Ok(Response {
                status: 404,
                body: format!("no scripted reply for '{}'", route),
            }),
        }
    }
}

fn route_key(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Method;

    fn get(url: &str) -> Request {
        Request {
            method: Method::Get,
            url: url.to_string(),
            body: None,
        }
    }

    #[test]
    fn test_route_key() {
        assert_eq!(route_key("http://host/progress?token=abc"), "progress");
        assert_eq!(route_key("http://host/"), "");
        assert_eq!(route_key("http://host/restart-tw"), "restart-tw");
    }

    #[tokio::test]
    async fn test_last_reply_repeats() {
        let transport = ScriptedTransport::new().on("play", [Reply::status(500, ""), Reply::ok("go")]);

        assert_eq!(transport.send(get("http://h/play")).await.unwrap().status, 500);
        assert_eq!(transport.send(get("http://h/play")).await.unwrap().status, 200);
        assert_eq!(transport.send(get("http://h/play")).await.unwrap().status, 200);
        assert_eq!(transport.count("play"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_route_is_404() {
        let transport = ScriptedTransport::new();
        let response = transport.send(get("http://h/despose?token=x")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_transport_failure_reply() {
        let transport = ScriptedTransport::new().on("load", [Reply::transport_failure("refused")]);
        let err = transport.send(get("http://h/load")).await.unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }
}
